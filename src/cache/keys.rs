use crate::routes::resource::model::ResourceType;

/// 生成资源缓存键：类型名与 id 直接拼接，例如 `people1`
pub fn resource_key(resource_type: ResourceType, resource_id: u64) -> String {
    format!("{}{}", resource_type, resource_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_type_and_id() {
        assert_eq!(resource_key(ResourceType::People, 1), "people1");
        assert_eq!(resource_key(ResourceType::Starships, 12), "starships12");
    }
}
