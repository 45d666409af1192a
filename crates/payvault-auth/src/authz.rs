//! Role-based authorization
//!
//! Roles are plain labels carried on the principal. Administrative labels
//! come from a fixed allow-list; anything else, including labels this module
//! has never heard of, is non-administrative. Unknown roles still get basic
//! employee access.

use std::fmt;

/// Labels that carry administrative privileges
pub const ADMIN_ROLES: [&str; 2] = ["HR", "IT"];

/// Label for ordinary employees
pub const EMPLOYEE_ROLE: &str = "Employee";

/// Something a principal may be allowed to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    /// See one's own profile, payslips and leave balance
    ViewOwnRecords,
    /// Browse every employee's record
    ViewAllEmployees,
    /// Create, edit and deactivate employee records
    ManageEmployees,
    /// Run and finalize payroll
    ProcessPayroll,
    /// Approve or reject leave requests
    ApproveLeave,
    /// Unlock accounts and issue password resets for others
    ManageAccounts,
}

/// A parsed role label
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    Hr,
    It,
    Employee,
    /// Any other non-empty label
    Other(String),
}

impl Role {
    /// Parse a label, ignoring surrounding whitespace and ASCII case
    ///
    /// Returns `None` for an empty label.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }

        let role = if label.eq_ignore_ascii_case("HR") {
            Role::Hr
        } else if label.eq_ignore_ascii_case("IT") {
            Role::It
        } else if label.eq_ignore_ascii_case(EMPLOYEE_ROLE) {
            Role::Employee
        } else {
            Role::Other(label.to_string())
        };
        Some(role)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Hr | Role::It)
    }

    pub fn permits(&self, permission: Permission) -> bool {
        self.is_admin() || permission == Permission::ViewOwnRecords
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Hr => f.write_str(ADMIN_ROLES[0]),
            Role::It => f.write_str(ADMIN_ROLES[1]),
            Role::Employee => f.write_str(EMPLOYEE_ROLE),
            Role::Other(label) => f.write_str(label),
        }
    }
}

/// Whether the label is administrative
pub fn is_admin(role: &str) -> bool {
    Role::parse(role).is_some_and(|r| r.is_admin())
}

/// Whether the label grants basic employee access
pub fn is_employee(role: &str) -> bool {
    Role::parse(role).is_some_and(|r| !r.is_admin())
}

/// Whether the label grants the permission
pub fn has_permission(role: &str, permission: Permission) -> bool {
    Role::parse(role).is_some_and(|r| r.permits(permission))
}
