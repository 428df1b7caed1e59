use serde::{Deserialize, Serialize};

use super::Identified;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub member_count: u32,
    /// Mirror of the viewer's membership set
    #[serde(default)]
    pub is_joined: bool,
}

impl Identified for Community {
    fn id(&self) -> &str {
        &self.id
    }
}
