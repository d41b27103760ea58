use serde::{Deserialize, Serialize};

/// One roster entry. Missing fields deserialize to their zero value, so an
/// update body always replaces the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub name: String,
    pub age: i64,
    pub commute_method: String,
    pub college: String,
    pub hobbies: String,
}

impl UserRecord {
    pub fn new(
        name: impl Into<String>,
        age: i64,
        commute_method: impl Into<String>,
        college: impl Into<String>,
        hobbies: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            age,
            commute_method: commute_method.into(),
            college: college.into(),
            hobbies: hobbies.into(),
        }
    }

    /// Field values in sheet column order.
    pub fn to_row(&self) -> Vec<serde_json::Value> {
        vec![
            self.name.clone().into(),
            self.age.into(),
            self.commute_method.clone().into(),
            self.college.clone().into(),
            self.hobbies.clone().into(),
        ]
    }
}

pub fn seed_records() -> Vec<UserRecord> {
    ["Jack", "David", "Austin"]
        .into_iter()
        .map(|name| UserRecord::new(name, 21, "Bike", "Boston University", "Golf"))
        .collect()
}
