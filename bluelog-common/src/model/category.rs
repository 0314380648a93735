use crate::model::{Id, bounded_text};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const CATEGORY_NAME_MAX_LEN: usize = 30;

/// Seeded by the initial migration. Posts fall back to it when their category is deleted.
pub const DEFAULT_CATEGORY: Id<CategoryMarker> = Id::new(1);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CategoryMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Category {
    pub id: Id<CategoryMarker>,
    pub name: CategoryName,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CategoryName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The category name must be 1 to {CATEGORY_NAME_MAX_LEN} characters: {0:?}")]
pub struct InvalidCategoryNameError(String);

impl CategoryName {
    pub fn new(name: String) -> Result<Self, InvalidCategoryNameError> {
        match bounded_text(name.clone(), CATEGORY_NAME_MAX_LEN) {
            Some(name) => Ok(Self(name)),
            None => Err(InvalidCategoryNameError(name)),
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CategoryName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CategoryName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"CategoryName"))
    }
}
