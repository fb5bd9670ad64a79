use televisit_core::Role;

/// Role-specific redirect targets used on every terminal condition:
/// room not found, unauthorized, ended, revoked, deleted.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Destination {
    DoctorAppointments,
    PatientAppointments,
}

impl Destination {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Doctor => Self::DoctorAppointments,
            Role::Patient => Self::PatientAppointments,
        }
    }
}

/// The navigation surface of the hosting page. Redirects are silent:
/// terminal rooms and failed authorization never show an error.
pub trait Navigator: Send + Sync {
    fn redirect(&self, destination: Destination);
}
