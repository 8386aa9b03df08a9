//! Shared types used across the codebase
//!
//! Roles and statuses are stored and sent as small integers. Internally they
//! are closed enums; serde goes through `i64` so existing documents and
//! clients keep working unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unrecognized integer code for one of the enums below
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} code: {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: i64,
}

/// Operations the authorization policy decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Select,
    Restore, // Undo soft-delete by setting status back to Active
}

impl Operation {
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Select)
    }
}

/// Account role carried in every session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Role {
    SuperAdmin,
    SubAdmin,
    Admin,
    ClientAdmin,
    ClientUser,
    TechnicianCompany,
    TechnicianUser,
}

impl Role {
    pub fn code(&self) -> i64 {
        match self {
            Role::SuperAdmin => 1,
            Role::SubAdmin => 2,
            Role::Admin => 3,
            Role::ClientAdmin => 4,
            Role::ClientUser => 6,
            Role::TechnicianCompany => 7,
            Role::TechnicianUser => 9,
        }
    }

    /// Internal staff: unrestricted tenant access
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::SubAdmin | Role::Admin)
    }

    /// Client portal users: scoped to exactly one tenant
    pub fn is_client_portal(&self) -> bool {
        matches!(self, Role::ClientAdmin | Role::ClientUser)
    }
}

impl TryFrom<i64> for Role {
    type Error = UnknownCode;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Role::SuperAdmin,
            2 => Role::SubAdmin,
            3 => Role::Admin,
            4 => Role::ClientAdmin,
            6 => Role::ClientUser,
            7 => Role::TechnicianCompany,
            9 => Role::TechnicianUser,
            other => return Err(UnknownCode { kind: "role", code: other }),
        })
    }
}

impl From<Role> for i64 {
    fn from(role: Role) -> Self {
        role.code()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Lifecycle status shared by every stored record (`status` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RecordStatus {
    Inactive,
    Active,
    Deleted,
}

impl RecordStatus {
    pub const FIELD: &'static str = "status";

    pub fn code(&self) -> i64 {
        match self {
            RecordStatus::Inactive => 0,
            RecordStatus::Active => 1,
            RecordStatus::Deleted => 2,
        }
    }
}

impl TryFrom<i64> for RecordStatus {
    type Error = UnknownCode;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RecordStatus::Inactive),
            1 => Ok(RecordStatus::Active),
            2 => Ok(RecordStatus::Deleted),
            other => Err(UnknownCode { kind: "status", code: other }),
        }
    }
}

impl From<RecordStatus> for i64 {
    fn from(status: RecordStatus) -> Self {
        status.code()
    }
}

/// Support ticket workflow state (`ticketStatus` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TicketStatus {
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
    ToInvoice,
}

impl TicketStatus {
    pub const FIELD: &'static str = "ticketStatus";

    pub fn code(&self) -> i64 {
        match self {
            TicketStatus::Open => 1,
            TicketStatus::InProgress => 2,
            TicketStatus::Pending => 3,
            TicketStatus::Resolved => 4,
            TicketStatus::Closed => 5,
            TicketStatus::ToInvoice => 6,
        }
    }
}

impl TryFrom<i64> for TicketStatus {
    type Error = UnknownCode;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => TicketStatus::Open,
            2 => TicketStatus::InProgress,
            3 => TicketStatus::Pending,
            4 => TicketStatus::Resolved,
            5 => TicketStatus::Closed,
            6 => TicketStatus::ToInvoice,
            other => return Err(UnknownCode { kind: "ticket status", code: other }),
        })
    }
}

impl From<TicketStatus> for i64 {
    fn from(status: TicketStatus) -> Self {
        status.code()
    }
}

/// Job card workflow state (`jobStatus` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum JobCardStatus {
    Open,
    Scheduled,
    InProgress,
    Completed,
    Closed,
}

impl JobCardStatus {
    pub const FIELD: &'static str = "jobStatus";

    pub fn code(&self) -> i64 {
        match self {
            JobCardStatus::Open => 1,
            JobCardStatus::Scheduled => 2,
            JobCardStatus::InProgress => 3,
            JobCardStatus::Completed => 4,
            JobCardStatus::Closed => 5,
        }
    }
}

impl TryFrom<i64> for JobCardStatus {
    type Error = UnknownCode;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => JobCardStatus::Open,
            2 => JobCardStatus::Scheduled,
            3 => JobCardStatus::InProgress,
            4 => JobCardStatus::Completed,
            5 => JobCardStatus::Closed,
            other => return Err(UnknownCode { kind: "job card status", code: other }),
        })
    }
}

impl From<JobCardStatus> for i64 {
    fn from(status: JobCardStatus) -> Self {
        status.code()
    }
}
