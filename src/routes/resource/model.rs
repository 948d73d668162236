use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 允许代理的资源类型
///
/// 各名称互不为前缀，因此 `类型 + id` 拼接出的缓存键可以唯一还原。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    People,
    Planets,
    Starships,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [
        ResourceType::People,
        ResourceType::Planets,
        ResourceType::Starships,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::People => "people",
            ResourceType::Planets => "planets",
            ResourceType::Starships => "starships",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownResourceType(s.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub endpoints: Vec<String>,
}

/// 批量请求中单个条目的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchItemResult {
    Success { endpoint: String, response: Value },
    Failure { endpoint: String, error: String },
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemResult::Success { .. })
    }
}
