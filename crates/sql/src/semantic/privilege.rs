//! Privilege requirements registered during analysis
//!
//! Analysis only records what a statement needs; enforcement happens in the
//! authorization collaborator after the statement is fully analyzed.

/// Privilege levels understood by the authorization collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Any access at all; used for existence checks.
    Any,
    Select,
    Insert,
    All,
}

/// A single access requirement on a catalog object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeRequest {
    pub db: String,
    pub table: Option<String>,
    pub privilege: Privilege,
}

/// Builder for privilege requests.
#[derive(Debug, Default)]
pub struct PrivilegeRequestBuilder {
    db: Option<String>,
    table: Option<String>,
    privilege: Option<Privilege>,
}

impl PrivilegeRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_table(mut self, db: impl Into<String>, table: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self.table = Some(table.into());
        self
    }

    pub fn on_database(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    pub fn all_of(mut self, privilege: Privilege) -> Self {
        self.privilege = Some(privilege);
        self
    }

    pub fn to_request(self) -> PrivilegeRequest {
        PrivilegeRequest {
            db: self.db.expect("privilege request without a database"),
            table: self.table,
            privilege: self.privilege.expect("privilege request without a privilege"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let req = PrivilegeRequestBuilder::new()
            .on_table("db1", "t")
            .all_of(Privilege::Insert)
            .to_request();
        assert_eq!(req.db, "db1");
        assert_eq!(req.table.as_deref(), Some("t"));
        assert_eq!(req.privilege, Privilege::Insert);
    }
}
