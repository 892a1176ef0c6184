use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{validate_color, validate_not_blank};

/// A category seeded at start-up and shared by every user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

/// Categories inserted by the seed step when no shared categories exist
pub const DEFAULT_CATEGORIES: &[DefaultCategory] = &[
    DefaultCategory {
        name: "Food & Dining",
        description: "Groceries, restaurants and takeaway",
        color: "#FF6B6B",
        icon: "utensils",
    },
    DefaultCategory {
        name: "Transportation",
        description: "Fuel, public transport and parking",
        color: "#4ECDC4",
        icon: "car",
    },
    DefaultCategory {
        name: "Shopping",
        description: "Clothing, electronics and general purchases",
        color: "#45B7D1",
        icon: "shopping-bag",
    },
    DefaultCategory {
        name: "Entertainment",
        description: "Movies, games and events",
        color: "#96CEB4",
        icon: "film",
    },
    DefaultCategory {
        name: "Bills & Utilities",
        description: "Rent, electricity, water and internet",
        color: "#FFEAA7",
        icon: "file-text",
    },
    DefaultCategory {
        name: "Healthcare",
        description: "Doctor visits, medicine and insurance",
        color: "#DDA0DD",
        icon: "heart",
    },
    DefaultCategory {
        name: "Travel",
        description: "Flights, hotels and holidays",
        color: "#98D8C8",
        icon: "plane",
    },
    DefaultCategory {
        name: "Education",
        description: "Courses, books and tuition",
        color: "#F7DC6F",
        icon: "book",
    },
    DefaultCategory {
        name: "Other",
        description: "Everything else",
        color: "#AEB6BF",
        icon: "more-horizontal",
    },
];

/// Who a category belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOwner {
    /// A default category visible to every user and mutable by none
    Shared,
    /// A category created by, visible to and mutable by a single user
    Owned(i64),
}

impl CategoryOwner {
    pub fn from_user_id(user_id: Option<i64>) -> Self {
        match user_id {
            Some(id) => CategoryOwner::Owned(id),
            None => CategoryOwner::Shared,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            CategoryOwner::Shared => None,
            CategoryOwner::Owned(id) => Some(*id),
        }
    }

    pub fn is_visible_to(&self, user_id: i64) -> bool {
        match self {
            CategoryOwner::Shared => true,
            CategoryOwner::Owned(owner_id) => *owner_id == user_id,
        }
    }

    pub fn can_be_modified_by(&self, user_id: i64) -> bool {
        matches!(self, CategoryOwner::Owned(owner_id) if *owner_id == user_id)
    }
}

/// Category entity used to classify expenses
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub owner: CategoryOwner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn is_default(&self) -> bool {
        self.owner == CategoryOwner::Shared
    }

    /// Claim the category for `user_id`; shared categories and other users' categories are refused
    pub fn into_owned_by(self, user_id: i64) -> Result<OwnedCategory, Category> {
        if self.owner.can_be_modified_by(user_id) {
            Ok(OwnedCategory {
                owner_id: user_id,
                category: self,
            })
        } else {
            Err(self)
        }
    }
}

/// A category proven to belong to `owner_id`.
///
/// Update and delete statements only accept this type, so a shared category
/// never reaches them.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedCategory {
    owner_id: i64,
    category: Category,
}

impl OwnedCategory {
    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn category_mut(&mut self) -> &mut Category {
        &mut self.category
    }

    pub fn into_inner(self) -> Category {
        self.category
    }
}

/// Category as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    /// Owner id, `null` for shared default categories
    pub user_id: Option<i64>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        let is_default = category.is_default();
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            color: category.color,
            icon: category.icon,
            user_id: category.owner.user_id(),
            is_default,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

/// Usage statistics for a category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub expense_count: i64,
}

/// Response body of the category listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryResponse>,
}

/// A category together with its usage statistics
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryStatsResponse {
    pub category: CategoryResponse,
    pub stats: CategoryStats,
}

/// Request payload for creating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "name": "Coffee",
    "description": "Daily caffeine",
    "color": "#6F4E37",
    "icon": "coffee"
}))]
pub struct CreateCategoryRequest {
    #[validate(
        length(max = 100, message = "Name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_color"))]
    pub color: String,

    #[validate(
        length(max = 50, message = "Icon cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub icon: String,
}

/// Request payload for updating a category; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[validate(
        length(max = 100, message = "Name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,

    /// An empty string clears the description
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,

    #[validate(
        length(max = 50, message = "Icon cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub icon: Option<String>,
}
