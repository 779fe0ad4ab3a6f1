use std::fmt;
use std::str::FromStr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Director General
    Dg,
    Director,
    DeskOfficer,
    /// Chief of Staff, read-only
    Cps,
    StrategyTeam,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Dg,
        Role::Director,
        Role::DeskOfficer,
        Role::Cps,
        Role::StrategyTeam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dg => "dg",
            Role::Director => "director",
            Role::DeskOfficer => "desk-officer",
            Role::Cps => "cps",
            Role::StrategyTeam => "strategy-team",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown role: {s}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub can_edit: bool,
    pub can_approve: bool,
    pub can_export: bool,
    pub can_view_all: bool,
    pub can_manage_kpis: bool,
    pub can_manage_pillars: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit,
    Approve,
    Export,
    ManageKpis,
    ManagePillars,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Submit => "submit data",
            Action::Approve => "approve submissions",
            Action::Export => "export reports",
            Action::ManageKpis => "manage KPIs",
            Action::ManagePillars => "manage pillars",
        };
        f.write_str(name)
    }
}

pub fn permissions(role: Role) -> Permissions {
    match role {
        Role::Dg => Permissions {
            can_edit: false,
            can_approve: true,
            can_export: true,
            can_view_all: true,
            can_manage_kpis: true,
            can_manage_pillars: true,
        },
        Role::Director => Permissions {
            can_edit: true,
            can_approve: true,
            can_export: true,
            can_view_all: true,
            can_manage_kpis: true,
            can_manage_pillars: true,
        },
        Role::DeskOfficer => Permissions {
            can_edit: true,
            ..Permissions::default()
        },
        Role::Cps => Permissions {
            can_export: true,
            can_view_all: true,
            ..Permissions::default()
        },
        Role::StrategyTeam => Permissions {
            can_edit: true,
            can_approve: false,
            can_export: true,
            can_view_all: true,
            can_manage_kpis: true,
            can_manage_pillars: true,
        },
    }
}

pub fn allows(role: Role, action: Action) -> bool {
    let granted = permissions(role);
    match action {
        Action::Submit => granted.can_edit,
        Action::Approve => granted.can_approve,
        Action::Export => granted.can_export,
        Action::ManageKpis => granted.can_manage_kpis,
        Action::ManagePillars => granted.can_manage_pillars,
    }
}

pub fn require(role: Role, action: Action) -> anyhow::Result<()> {
    if allows(role, action) {
        Ok(())
    } else {
        anyhow::bail!("role {role} is not allowed to {action}")
    }
}

/// Department filter a role may query with. Roles without `can_view_all`
/// only see a single department and must name it.
pub fn department_scope(role: Role, department: Option<&str>) -> anyhow::Result<Option<&str>> {
    let department = department.map(str::trim).filter(|d| !d.is_empty());
    if permissions(role).can_view_all || department.is_some() {
        Ok(department)
    } else {
        anyhow::bail!("role {role} can only view its own department; pass --department")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_names() {
        assert_eq!("desk-officer".parse::<Role>().unwrap(), Role::DeskOfficer);
        assert_eq!("strategy-team".parse::<Role>().unwrap(), Role::StrategyTeam);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn only_directors_and_dg_approve() {
        let approvers: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|role| allows(*role, Action::Approve))
            .collect();
        assert_eq!(approvers, vec![Role::Dg, Role::Director]);
    }

    #[test]
    fn cps_is_read_only() {
        let granted = permissions(Role::Cps);
        assert!(!granted.can_edit);
        assert!(!granted.can_approve);
        assert!(granted.can_export);
        assert!(granted.can_view_all);
        assert!(require(Role::Cps, Action::Submit).is_err());
    }

    #[test]
    fn desk_officer_submits_but_cannot_export() {
        assert!(require(Role::DeskOfficer, Action::Submit).is_ok());
        assert!(!allows(Role::DeskOfficer, Action::Export));
        assert!(!permissions(Role::DeskOfficer).can_view_all);
    }

    #[test]
    fn dg_approves_but_does_not_enter_data() {
        assert!(allows(Role::Dg, Action::Approve));
        assert!(!allows(Role::Dg, Action::Submit));
    }

    #[test]
    fn pillar_management_follows_permission_table() {
        let managers: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|role| allows(*role, Action::ManagePillars))
            .collect();
        assert_eq!(managers, vec![Role::Dg, Role::Director, Role::StrategyTeam]);
        assert!(require(Role::DeskOfficer, Action::ManagePillars).is_err());
    }

    #[test]
    fn desk_officer_must_name_a_department() {
        assert!(department_scope(Role::DeskOfficer, None).is_err());
        assert!(department_scope(Role::DeskOfficer, Some("  ")).is_err());
        assert_eq!(department_scope(Role::DeskOfficer, Some("DED")).unwrap(), Some("DED"));
        assert_eq!(department_scope(Role::Cps, None).unwrap(), None);
        assert_eq!(department_scope(Role::Director, Some("HR")).unwrap(), Some("HR"));
    }
}
