//! Storage binding for domain records

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The object stores the browser database keeps, one per entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Cycles,
    Cages,
    ProductionLogs,
    FeedLogs,
    Sales,
    Expenses,
    Vaccinations,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Cycles,
        Collection::Cages,
        Collection::ProductionLogs,
        Collection::FeedLogs,
        Collection::Sales,
        Collection::Expenses,
        Collection::Vaccinations,
    ];

    /// Store name as used in the browser database and in backup documents
    pub fn store_name(&self) -> &'static str {
        match self {
            Collection::Cycles => "cycles",
            Collection::Cages => "cages",
            Collection::ProductionLogs => "productionLogs",
            Collection::FeedLogs => "feedLogs",
            Collection::Sales => "sales",
            Collection::Expenses => "expenses",
            Collection::Vaccinations => "vaccinations",
        }
    }

    /// Fields that can be queried with an index lookup
    pub fn indexes(&self) -> &'static [&'static str] {
        match self {
            Collection::Cycles => &["name", "status", "startDate"],
            Collection::Cages => &["cycleId", "name"],
            Collection::ProductionLogs => &["cageId", "date", "cycleId"],
            Collection::FeedLogs => &["cageId", "date", "cycleId"],
            Collection::Sales => &["cycleId", "date"],
            Collection::Expenses => &["cycleId", "date", "category"],
            Collection::Vaccinations => &["cycleId", "date"],
        }
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.indexes().contains(&field)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.store_name())
    }
}

/// A record kept in one of the object stores
///
/// Ids are assigned by the store on insert; `0` marks a record that has not
/// been stored yet.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    fn is_new(&self) -> bool {
        self.id() == 0
    }
}

macro_rules! impl_record {
    ($ty:ty, $collection:expr) => {
        impl $crate::models::Record for $ty {
            const COLLECTION: $crate::models::Collection = $collection;

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
        }
    };
}

pub(crate) use impl_record;
