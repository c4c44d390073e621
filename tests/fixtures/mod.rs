//! Sample backend payloads shared by the integration tests

#![allow(dead_code)]

use coordii_client::models::wardrobe::{Garment, GarmentDraft, Outfit, UserProfile, WeatherSnapshot};

pub const HAKATA: &str = "福岡市博多区";
pub const CHUO: &str = "福岡市中央区";

pub fn garment(cloth_id: i64, category: &str) -> Garment {
    Garment {
        cloth_id,
        category: category.to_string(),
        image_url: format!("https://cdn.example.test/clothes/{cloth_id}.jpg"),
        brand: Some("UNIQLO".to_string()),
        color: Some("ネイビー".to_string()),
        description: None,
    }
}

pub fn starter_closet() -> Vec<Garment> {
    vec![
        garment(1, "トップス"),
        garment(2, "トップス"),
        garment(3, "ボトムス"),
        garment(4, "シューズ"),
    ]
}

pub fn draft(category: &str) -> GarmentDraft {
    GarmentDraft {
        category: category.to_string(),
        brand: Some("GU".to_string()),
        color: Some("ベージュ".to_string()),
        seasons: vec!["春".to_string(), "秋".to_string()],
        suitable_min_temp: Some(10.0),
        suitable_max_temp: Some(22.0),
        ..GarmentDraft::default()
    }
}

pub fn weather_for(region: &str) -> WeatherSnapshot {
    let (max, min) = if region == HAKATA { (21.0, 14.0) } else { (19.0, 12.0) };
    WeatherSnapshot {
        max,
        min,
        weather: "晴れ".to_string(),
        icon_url: Some("https://openweathermap.org/img/wn/01d@2x.png".to_string()),
        humidity: 55.0,
        pop: 10.0,
        wind_direction: Some("北西".to_string()),
        wind_speed: 3.2,
    }
}

pub fn outfit(coordinate_id: &str) -> Outfit {
    Outfit {
        coordinate_id: Some(coordinate_id.to_string()),
        target_date: Some("2026-10-19".to_string()),
        tops_images: vec!["https://cdn.example.test/clothes/1.jpg".to_string()],
        bottoms_image: Some("https://cdn.example.test/clothes/3.jpg".to_string()),
        shoes_image: Some("https://cdn.example.test/clothes/4.jpg".to_string()),
        reason: Some("晴れて過ごしやすい一日なので軽めの重ね着に".to_string()),
        ..Outfit::default()
    }
}

pub fn profile(address: Option<&str>, face_photo: bool) -> UserProfile {
    UserProfile {
        gender: Some("female".to_string()),
        height: Some(160),
        address: address.map(str::to_string),
        image_link: face_photo.then(|| "https://cdn.example.test/faces/me.jpg".to_string()),
        ..UserProfile::default()
    }
}

/// Smallest byte prefix `image::guess_format` recognises as JPEG.
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
