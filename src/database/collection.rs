use std::fmt;

/// Every stored collection. The stored name is the `collection` column
/// value in Postgres and the map key in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Clients,
    Sites,
    Assets,
    Contacts,
    Documents,
    Notes,
    ServiceAgreements,
    JobCards,
    JobCardAssets,
    JobCardChecklist,
    JobCardTechnicians,
    JobCardOwners,
    JobCardComments,
    SupportTickets,
    TicketDetails,
    TicketLogs,
    TicketAttachments,
    TicketComments,
    TicketTechnicians,
    TicketTime,
    TicketOwners,
    MaintenanceLogs,
    Technicians,
    TechnicianInsurance,
    TechnicianTags,
    Users,
    Resources,
    Checklists,
    Settings,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Sites => "sites",
            Collection::Assets => "assets",
            Collection::Contacts => "contacts",
            Collection::Documents => "documents",
            Collection::Notes => "notes",
            Collection::ServiceAgreements => "service_agreements",
            Collection::JobCards => "job_cards",
            Collection::JobCardAssets => "job_card_assets",
            Collection::JobCardChecklist => "job_card_checklist",
            Collection::JobCardTechnicians => "job_card_technicians",
            Collection::JobCardOwners => "job_card_owners",
            Collection::JobCardComments => "job_card_comments",
            Collection::SupportTickets => "support_tickets",
            Collection::TicketDetails => "ticket_details",
            Collection::TicketLogs => "ticket_logs",
            Collection::TicketAttachments => "ticket_attachments",
            Collection::TicketComments => "ticket_comments",
            Collection::TicketTechnicians => "ticket_technicians",
            Collection::TicketTime => "ticket_time",
            Collection::TicketOwners => "ticket_owners",
            Collection::MaintenanceLogs => "maintenance_logs",
            Collection::Technicians => "technicians",
            Collection::TechnicianInsurance => "technician_insurance",
            Collection::TechnicianTags => "technician_tags",
            Collection::Users => "users",
            Collection::Resources => "resources",
            Collection::Checklists => "checklists",
            Collection::Settings => "settings",
        }
    }

    /// Field naming the owning tenant. Clients are their own tenant, so the
    /// field is `id`. `None` for collections that are not tenant data.
    pub fn tenant_field(&self) -> Option<&'static str> {
        match self {
            Collection::Clients => Some("id"),
            Collection::Technicians
            | Collection::TechnicianInsurance
            | Collection::TechnicianTags
            | Collection::Users
            | Collection::Resources
            | Collection::Checklists
            | Collection::Settings => None,
            _ => Some("clientId"),
        }
    }

    pub fn is_tenant_scoped(&self) -> bool {
        self.tenant_field().is_some()
    }

    /// Tenant data that client portal users may create for their own tenant
    pub fn portal_creatable(&self) -> bool {
        matches!(
            self,
            Collection::SupportTickets
                | Collection::TicketComments
                | Collection::TicketAttachments
                | Collection::JobCardComments
        )
    }

    /// Non-tenant collections readable by staff only
    pub fn staff_only_read(&self) -> bool {
        matches!(
            self,
            Collection::Technicians
                | Collection::TechnicianInsurance
                | Collection::TechnicianTags
                | Collection::Users
        )
    }

    /// Path segment under `/api/clients/:id/`
    pub fn from_client_kind(kind: &str) -> Option<Self> {
        Some(match kind {
            "sites" => Collection::Sites,
            "assets" => Collection::Assets,
            "contacts" => Collection::Contacts,
            "documents" => Collection::Documents,
            "notes" => Collection::Notes,
            "service-agreements" => Collection::ServiceAgreements,
            _ => return None,
        })
    }

    /// Path segment under `/api/job-cards/:id/`
    pub fn from_job_card_child(child: &str) -> Option<Self> {
        Some(match child {
            "assets" => Collection::JobCardAssets,
            "checklist" => Collection::JobCardChecklist,
            "technicians" => Collection::JobCardTechnicians,
            "owners" => Collection::JobCardOwners,
            "comments" => Collection::JobCardComments,
            _ => return None,
        })
    }

    /// Path segment under `/api/support-tickets/:id/`
    pub fn from_ticket_child(child: &str) -> Option<Self> {
        Some(match child {
            "attachments" => Collection::TicketAttachments,
            "comments" => Collection::TicketComments,
            "technicians" => Collection::TicketTechnicians,
            "time" => Collection::TicketTime,
            "owners" => Collection::TicketOwners,
            _ => return None,
        })
    }

    /// Singular name for client-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Clients => "Client",
            Collection::Sites => "Site",
            Collection::Assets => "Asset",
            Collection::Contacts => "Contact",
            Collection::Documents => "Document",
            Collection::Notes => "Note",
            Collection::ServiceAgreements => "Service agreement",
            Collection::JobCards => "Job card",
            Collection::JobCardAssets => "Job card asset",
            Collection::JobCardChecklist => "Checklist item",
            Collection::JobCardTechnicians => "Job card technician",
            Collection::JobCardOwners => "Job card owner",
            Collection::JobCardComments => "Comment",
            Collection::SupportTickets => "Support ticket",
            Collection::TicketDetails => "Ticket detail",
            Collection::TicketLogs => "Ticket log",
            Collection::TicketAttachments => "Attachment",
            Collection::TicketComments => "Comment",
            Collection::TicketTechnicians => "Ticket technician",
            Collection::TicketTime => "Time entry",
            Collection::TicketOwners => "Ticket owner",
            Collection::MaintenanceLogs => "Maintenance log",
            Collection::Technicians => "Technician",
            Collection::TechnicianInsurance => "Insurance record",
            Collection::TechnicianTags => "Tag",
            Collection::Users => "User",
            Collection::Resources => "Resource",
            Collection::Checklists => "Checklist",
            Collection::Settings => "Settings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
