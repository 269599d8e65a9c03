//! Manager reference resolution
//!
//! Name-or-id manager references are resolved once, at construction, into a
//! single canonical form. Everything downstream works on ids only.

use crate::employee::{Employee, EmployeeId, ManagerRef};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// How an employee's manager reference was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManagerResolution {
    /// No manager reference: a root of the hierarchy
    Root,
    /// Reference was an id of a known employee
    ById { manager: EmployeeId },
    /// Reference was a name matching exactly one employee
    ByName { manager: EmployeeId },
    /// Reference was a name shared by several employees. No edge is created.
    Ambiguous { candidates: Vec<EmployeeId> },
    /// Reference resolves to the employee itself
    SelfReference,
    /// Reference matches no known employee
    Unresolved { reference: ManagerRef },
}

impl ManagerResolution {
    /// The manager id, only for unambiguous resolutions
    pub fn manager_id(&self) -> Option<EmployeeId> {
        match self {
            ManagerResolution::ById { manager } | ManagerResolution::ByName { manager } => {
                Some(*manager)
            }
            _ => None,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, ManagerResolution::Root)
    }
}

/// Id and name indices over a snapshot
pub(crate) struct EmployeeIndex<'a> {
    /// Id -> position of the first record carrying that id
    pub by_id: FxHashMap<EmployeeId, usize>,
    /// Name -> every id carrying that name, in snapshot order
    pub by_name: FxHashMap<&'a str, Vec<EmployeeId>>,
    /// Ids that appear more than once, in snapshot order
    pub duplicate_ids: Vec<EmployeeId>,
}

impl<'a> EmployeeIndex<'a> {
    pub fn build(employees: &'a [Employee]) -> Self {
        let mut by_id = FxHashMap::default();
        let mut by_name: FxHashMap<&'a str, Vec<EmployeeId>> = FxHashMap::default();
        let mut duplicate_ids = Vec::new();

        for (pos, employee) in employees.iter().enumerate() {
            if by_id.contains_key(&employee.id) {
                duplicate_ids.push(employee.id);
                continue;
            }
            by_id.insert(employee.id, pos);
            by_name.entry(employee.name.trim()).or_default().push(employee.id);
        }

        Self {
            by_id,
            by_name,
            duplicate_ids,
        }
    }

    /// Whether the record at `pos` is the canonical one for its id
    pub fn is_canonical(&self, pos: usize, id: EmployeeId) -> bool {
        self.by_id.get(&id) == Some(&pos)
    }

    /// Resolve a single employee's manager reference.
    ///
    /// A name that matches nobody but parses as a known id is treated as an
    /// id reference; spreadsheet imports often carry ids as text.
    pub fn resolve(&self, employee: &Employee) -> ManagerResolution {
        let resolved = match &employee.manager {
            None => return ManagerResolution::Root,
            Some(ManagerRef::Id(id)) => {
                if self.by_id.contains_key(id) {
                    ManagerResolution::ById { manager: *id }
                } else {
                    return ManagerResolution::Unresolved {
                        reference: ManagerRef::Id(*id),
                    };
                }
            }
            Some(ManagerRef::Name(name)) => match self.by_name.get(name.trim()) {
                Some(ids) if ids.len() == 1 => ManagerResolution::ByName { manager: ids[0] },
                Some(ids) => {
                    return ManagerResolution::Ambiguous {
                        candidates: ids.clone(),
                    }
                }
                None => match name.trim().parse::<u64>().map(EmployeeId) {
                    Ok(id) if self.by_id.contains_key(&id) => ManagerResolution::ById { manager: id },
                    _ => {
                        return ManagerResolution::Unresolved {
                            reference: ManagerRef::Name(name.clone()),
                        }
                    }
                },
            },
        };

        if resolved.manager_id() == Some(employee.id) {
            ManagerResolution::SelfReference
        } else {
            resolved
        }
    }
}
