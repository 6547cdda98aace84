//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod audit_log;
pub mod budget_request;
pub mod enums;
pub mod expense;
pub mod expense_approval;
pub mod invoice;
pub mod invoice_item;
pub mod invoice_payment;
pub mod notification;
pub mod project;
pub mod project_budget;
pub mod project_member;
pub mod project_plan_item;
pub mod user;

// Re-export specific types to avoid conflicts
pub use audit_log::{Column as AuditLogColumn, Entity as AuditLog, Model as AuditLogModel};
pub use budget_request::{
    Column as BudgetRequestColumn, Entity as BudgetRequest, Model as BudgetRequestModel,
};
pub use enums::{
    ApprovalStatus, AuditAction, InvoiceType, NotificationType, PaymentMethod, PaymentStatus,
    ProjectStatus, UserRole,
};
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use expense_approval::{
    Column as ExpenseApprovalColumn, Entity as ExpenseApproval, Model as ExpenseApprovalModel,
};
pub use invoice::{Column as InvoiceColumn, Entity as Invoice, Model as InvoiceModel};
pub use invoice_item::{
    Column as InvoiceItemColumn, Entity as InvoiceItem, Model as InvoiceItemModel,
};
pub use invoice_payment::{
    Column as InvoicePaymentColumn, Entity as InvoicePayment, Model as InvoicePaymentModel,
};
pub use notification::{
    Column as NotificationColumn, Entity as Notification, Model as NotificationModel,
};
pub use project::{Column as ProjectColumn, Entity as Project, Model as ProjectModel};
pub use project_budget::{
    Column as ProjectBudgetColumn, Entity as ProjectBudget, Model as ProjectBudgetModel,
};
pub use project_member::{
    Column as ProjectMemberColumn, Entity as ProjectMember, Model as ProjectMemberModel,
};
pub use project_plan_item::{
    Column as ProjectPlanItemColumn, Entity as ProjectPlanItem, Model as ProjectPlanItemModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
