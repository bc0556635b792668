use serde::{Serialize, Serializer};
use tracing::debug;

use crate::store::AttendanceStore;

/// Which employees a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Employees currently assigned to the department. A headcount of 0
    /// matches no records at all.
    Department { department_id: u64, headcount: u64 },
}

impl Scope {
    pub fn matches_nothing(&self) -> bool {
        matches!(self, Scope::Department { headcount: 0, .. })
    }
}

/// Resolves the department filter against current assignments.
pub async fn resolve_scope(
    store: &dyn AttendanceStore,
    department_id: Option<u64>,
) -> Result<Scope, sqlx::Error> {
    let Some(department_id) = department_id else {
        return Ok(Scope::All);
    };

    let headcount = store.department_headcount(department_id).await?;
    debug!(department_id, headcount, "Resolved department scope");

    Ok(Scope::Department {
        department_id,
        headcount,
    })
}

/// `employeeScope` KPI: the literal `"All"` when no department filter was
/// applied, otherwise the number of employees in the department (possibly 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeScope {
    All,
    Count(u64),
}

impl From<&Scope> for EmployeeScope {
    fn from(scope: &Scope) -> Self {
        match scope {
            Scope::All => EmployeeScope::All,
            Scope::Department { headcount, .. } => EmployeeScope::Count(*headcount),
        }
    }
}

impl Serialize for EmployeeScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EmployeeScope::All => serializer.serialize_str("All"),
            EmployeeScope::Count(n) => serializer.serialize_u64(*n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    #[actix_web::test]
    async fn no_department_means_everyone() {
        let store = InMemoryStore::default();
        let scope = resolve_scope(&store, None).await.unwrap();

        assert_eq!(scope, Scope::All);
        assert!(!scope.matches_nothing());
    }

    #[actix_web::test]
    async fn department_resolves_to_its_headcount() {
        let store = InMemoryStore::default();
        store.add_employee(1, 10);
        store.add_employee(2, 20);
        store.add_employee(3, 10);

        let scope = resolve_scope(&store, Some(10)).await.unwrap();
        assert_eq!(
            scope,
            Scope::Department {
                department_id: 10,
                headcount: 2
            }
        );
        assert!(!scope.matches_nothing());
    }

    #[actix_web::test]
    async fn empty_department_matches_nothing() {
        let store = InMemoryStore::default();
        store.add_employee(1, 10);

        let scope = resolve_scope(&store, Some(99)).await.unwrap();
        assert!(scope.matches_nothing());
    }

    #[test]
    fn employee_scope_serializes_as_sentinel_or_count() {
        assert_eq!(serde_json::to_value(EmployeeScope::All).unwrap(), serde_json::json!("All"));
        assert_eq!(serde_json::to_value(EmployeeScope::Count(0)).unwrap(), serde_json::json!(0));
        assert_eq!(
            EmployeeScope::from(&Scope::Department {
                department_id: 4,
                headcount: 2
            }),
            EmployeeScope::Count(2)
        );
    }
}
