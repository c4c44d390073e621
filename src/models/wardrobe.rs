use garde::Validate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Garment categories in closet display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, EnumIter, Display, PartialEq, Eq, Hash)]
pub enum GarmentCategory {
    #[strum(serialize = "アウター")]
    #[serde(rename = "アウター")]
    Outer,
    #[strum(serialize = "トップス")]
    #[serde(rename = "トップス")]
    Tops,
    #[strum(serialize = "ボトムス")]
    #[serde(rename = "ボトムス")]
    Bottoms,
    #[strum(serialize = "ワンピース")]
    #[serde(rename = "ワンピース")]
    Dress,
    #[strum(serialize = "シューズ")]
    #[serde(rename = "シューズ")]
    Shoes,
    #[strum(serialize = "小物")]
    #[serde(rename = "小物")]
    Accessory,
}

/// A registered garment as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Garment {
    pub cloth_id: i64,
    pub category: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Garment attributes, either proposed by image analysis or edited by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GarmentDraft {
    #[garde(length(min = 1, max = 50))]
    pub category: String,

    #[garde(length(max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[garde(length(max = 50))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seasons: Vec<String>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[garde(range(min = -30.0, max = 50.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitable_min_temp: Option<f64>,

    #[garde(range(min = -30.0, max = 50.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitable_max_temp: Option<f64>,

    #[garde(length(max = 500))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Closet contents grouped by category, every known category present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Inventory {
    pub groups: BTreeMap<String, Vec<Garment>>,
}

impl Inventory {
    /// Group a flat garment list; garments in unknown categories are dropped.
    pub fn group(garments: Vec<Garment>) -> Self {
        let mut groups: BTreeMap<String, Vec<Garment>> = GarmentCategory::iter()
            .map(|c| (c.to_string(), Vec::new()))
            .collect();
        for garment in garments {
            if let Some(group) = groups.get_mut(&garment.category) {
                group.push(garment);
            }
        }
        Self { groups }
    }

    pub fn category(&self, category: GarmentCategory) -> &[Garment] {
        self.groups
            .get(&category.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Forecast snapshot for one region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub max: f64,
    pub min: f64,
    pub weather: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub wind_direction: Option<String>,
    #[serde(default)]
    pub wind_speed: f64,
}

/// A generated outfit, also the element type of the history list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Outfit {
    #[serde(rename = "coordinateId", default)]
    pub coordinate_id: Option<String>,
    #[serde(rename = "targetDate", default)]
    pub target_date: Option<String>,
    #[serde(rename = "weatherData", default)]
    pub weather: Option<serde_json::Value>,
    #[serde(default)]
    pub outer_image: Option<String>,
    #[serde(default)]
    pub tops_images: Vec<String>,
    #[serde(default)]
    pub bottoms_image: Option<String>,
    #[serde(default)]
    pub shoes_image: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Rendered virtual try-on image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TryOnImage {
    pub image_url: String,
}

/// Stored user profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_day: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    /// The user's region.
    #[serde(default)]
    pub address: Option<String>,
    /// Face photo used by try-on rendering.
    #[serde(default)]
    pub image_link: Option<String>,
    #[serde(default)]
    pub weekly_schedule: BTreeMap<String, String>,
}

impl UserProfile {
    pub fn has_face_photo(&self) -> bool {
        self.image_link.as_deref().is_some_and(|link| !link.is_empty())
    }
}

/// Presigned upload destination for a garment photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
    pub image_url: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn garment(id: i64, category: &str) -> Garment {
        Garment {
            cloth_id: id,
            category: category.to_string(),
            image_url: format!("https://img/{id}.jpg"),
            brand: None,
            color: None,
            description: None,
        }
    }

    #[test]
    fn test_group_keeps_every_category() {
        let inventory = Inventory::group(vec![garment(1, "トップス"), garment(2, "トップス"), garment(3, "シューズ")]);
        assert_eq!(inventory.groups.len(), 6);
        assert_eq!(inventory.category(GarmentCategory::Tops).len(), 2);
        assert_eq!(inventory.category(GarmentCategory::Shoes).len(), 1);
        assert!(inventory.category(GarmentCategory::Outer).is_empty());
        assert_eq!(inventory.len(), 3);
    }

    #[test]
    fn test_group_drops_unknown_category() {
        let inventory = Inventory::group(vec![garment(1, "帽子")]);
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_draft_requires_category() {
        let draft = GarmentDraft::default();
        assert!(draft.validate().is_err());

        let draft = GarmentDraft { category: "トップス".to_string(), ..Default::default() };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_face_photo_check() {
        let mut profile = UserProfile::default();
        assert!(!profile.has_face_photo());
        profile.image_link = Some(String::new());
        assert!(!profile.has_face_photo());
        profile.image_link = Some("https://img/face.jpg".to_string());
        assert!(profile.has_face_photo());
    }
}
