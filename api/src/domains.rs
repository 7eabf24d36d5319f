pub const NAME_MAX_LEN: usize = 255;

#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize, sqlx::FromRow,
)]
pub struct Person {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Returns a copy carrying the id assigned by a repository.
    pub fn with_id(&self, id: i64) -> Self {
        Self {
            id: Some(id),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_null_and_missing_ids_as_unpersisted() {
        let null: Person = serde_json::from_str(r#"{"id": null, "name": "Steve"}"#).unwrap();
        let missing: Person = serde_json::from_str(r#"{"name": "Steve"}"#).unwrap();

        assert_eq!(null, Person::new("Steve"));
        assert_eq!(missing, Person::new("Steve"));
    }

    #[test]
    fn with_id_returns_a_new_value() {
        let person = Person::new("Steve");
        let stored = person.with_id(7);

        assert_eq!(person.id, None);
        assert_eq!(stored.id, Some(7));
        assert_eq!(stored.name, "Steve");
    }

    #[test]
    fn serializes_with_numeric_id() {
        let json = serde_json::to_value(Person::new("Ada").with_id(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 3, "name": "Ada" }));
    }
}
