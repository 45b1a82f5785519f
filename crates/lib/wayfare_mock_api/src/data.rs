//! Seed data: demo users and the experience catalog.

use crate::models::Category::{Adventure, Culture, Food};
use crate::models::{Category, Experience, Role};

/// A demo account.
#[derive(Debug, Clone, Copy)]
pub struct DemoUser {
    pub id: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
}

pub const USERS: &[DemoUser] = &[
    DemoUser {
        id: "1",
        email: "user@example.com",
        password: "password",
        role: Role::User,
    },
    DemoUser {
        id: "2",
        email: "admin@example.com",
        password: "password",
        role: Role::Admin,
    },
];

pub fn find_user(email: &str, password: &str) -> Option<&'static DemoUser> {
    USERS
        .iter()
        .find(|u| u.email == email && u.password == password)
}

pub fn find_user_by_id(id: &str) -> Option<&'static DemoUser> {
    USERS.iter().find(|u| u.id == id)
}

/// (id, title, category, price in cents, duration in minutes, image seed, blurb)
type Row = (u64, &'static str, Category, u64, u32, &'static str, &'static str);

const CATALOG: &[Row] = &[
    (1, "Wine Tasting in Tuscany", Food, 12900, 180, "wine", "Explore Tuscan vineyards."),
    (2, "Skydiving Over the Coast", Adventure, 24900, 60, "sky", "Adrenaline-packed jump."),
    (3, "Private Sushi Workshop", Culture, 17900, 120, "sushi", "Master sushi basics."),
    (4, "Mediterranean Cooking Class", Food, 15900, 150, "cooking", "Learn authentic recipes."),
    (5, "Mountain Hiking Adventure", Adventure, 19900, 240, "hiking", "Conquer scenic peaks."),
    (6, "Historical City Tour", Culture, 8900, 120, "tour", "Discover ancient stories."),
    (7, "Cheese & Wine Pairing", Food, 13900, 90, "cheese", "Perfect combinations."),
    (8, "Rock Climbing Experience", Adventure, 22900, 180, "climbing", "Scale new heights."),
    (9, "Art Museum Private Tour", Culture, 11900, 120, "art", "Explore masterpieces."),
    (10, "Seafood Market Tour", Food, 16900, 180, "seafood", "Fresh catch of the day."),
    (11, "Surfing Lessons", Adventure, 18900, 120, "surfing", "Ride the waves."),
    (12, "Traditional Dance Workshop", Culture, 9900, 90, "dance", "Learn local moves."),
    (13, "Farm to Table Experience", Food, 17900, 210, "farm", "From field to plate."),
    (14, "Paragliding Adventure", Adventure, 26900, 60, "paragliding", "Soar through the skies."),
    (15, "Ancient Ruins Exploration", Culture, 10900, 180, "ruins", "Step back in time."),
    (16, "Chocolate Making Workshop", Food, 14900, 120, "chocolate", "Create sweet memories."),
    (17, "Scuba Diving Discovery", Adventure, 28900, 180, "diving", "Dive into the deep."),
    (18, "Local Music Performance", Culture, 7900, 90, "music", "Feel the rhythm."),
    (19, "Pasta Making Class", Food, 16900, 150, "pasta", "Handmade Italian pasta."),
    (20, "White Water Rafting", Adventure, 21900, 180, "rafting", "Navigate wild rapids."),
    (21, "Archaeological Site Visit", Culture, 11900, 150, "archaeology", "Uncover hidden treasures."),
    (22, "Olive Oil Tasting", Food, 12900, 90, "olive", "Taste the finest oils."),
    (23, "Bungee Jumping Thrill", Adventure, 23900, 45, "bungee", "Leap into adventure."),
    (24, "Folklore Evening Show", Culture, 9900, 120, "folklore", "Traditional performances."),
    (25, "BBQ Masterclass", Food, 15900, 180, "bbq", "Master the grill."),
    (26, "Cave Exploration", Adventure, 19900, 240, "cave", "Explore underground wonders."),
    (27, "Calligraphy Workshop", Culture, 10900, 120, "calligraphy", "Master the art of writing."),
    (28, "Truffle Hunting Experience", Food, 22900, 180, "truffle", "Hunt for culinary gold."),
    (29, "Zipline Adventure", Adventure, 17900, 90, "zipline", "Fly through the forest."),
    (30, "Traditional Pottery Class", Culture, 13900, 150, "pottery", "Shape your creativity."),
];

/// The 30-item catalog, in id order.
pub fn seed_experiences() -> Vec<Experience> {
    CATALOG
        .iter()
        .map(
            |&(id, title, category, price_cents, duration_min, seed, blurb)| Experience {
                id,
                title: title.to_string(),
                category,
                price_cents,
                duration_min,
                images: vec![format!("https://picsum.photos/seed/{seed}/720/400")],
                short_description: blurb.to_string(),
            },
        )
        .collect()
}
