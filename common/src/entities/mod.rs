pub mod global_contexts;
pub mod prelude;
pub mod projects;
pub mod prompt_variables;
pub mod prompt_versions;
pub mod prompts;
pub mod repository_connections;
pub mod sync_events;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Related;

    #[test]
    fn active_enum_serialization_roundtrip() {
        fn assert_roundtrip<T>(value: &T)
        where
            T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + core::fmt::Debug,
        {
            let encoded = serde_json::to_string(value).unwrap();
            let decoded: T = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, *value);
        }

        assert_roundtrip(&prompt_versions::VersionStatus::Draft);
        assert_roundtrip(&prompt_versions::VersionStatus::Published);
        assert_roundtrip(&prompt_versions::VersionStatus::Archived);
        assert_roundtrip(&prompt_variables::VariableType::String);
        assert_roundtrip(&prompt_variables::VariableType::Number);
        assert_roundtrip(&prompt_variables::VariableType::Boolean);
        assert_roundtrip(&prompt_variables::VariableType::Json);
    }

    #[test]
    fn status_and_type_serialize_as_upper_case_labels() {
        assert_eq!(
            serde_json::to_string(&prompt_versions::VersionStatus::Published).unwrap(),
            "\"PUBLISHED\""
        );
        assert_eq!(
            serde_json::to_string(&prompt_variables::VariableType::Json).unwrap(),
            "\"JSON\""
        );
    }

    #[test]
    fn relation_definitions_are_accessible() {
        let _ = <global_contexts::Entity as Related<projects::Entity>>::to();
        let _ = <projects::Entity as Related<prompts::Entity>>::to();
        let _ = <prompts::Entity as Related<projects::Entity>>::to();
        let _ = <prompts::Entity as Related<prompt_versions::Entity>>::to();
        let _ = <prompt_versions::Entity as Related<prompts::Entity>>::to();
        let _ = <prompt_versions::Entity as Related<prompt_variables::Entity>>::to();
        let _ = <prompt_variables::Entity as Related<prompt_versions::Entity>>::to();
        let _ = <repository_connections::Entity as Related<projects::Entity>>::to();
    }
}
