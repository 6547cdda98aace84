//! String-backed enums shared by several tables.
//!
//! All of them are stored as their upper-case string value so that rows stay
//! readable from a plain SQL shell.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Approval lifecycle shared by budget requests, expenses and invoices.
///
/// `Pending` is the only state that accepts a transition; the other two are terminal.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting a decision
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Accepted, effect applied
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Refused, no effect
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl ApprovalStatus {
    /// Whether no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Derived payment progress of an invoice.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// No payment recorded
    #[sea_orm(string_value = "UNPAID")]
    Unpaid,
    /// Some but not all of the amount has been paid
    #[sea_orm(string_value = "PARTIAL_PAID")]
    PartialPaid,
    /// Paid in full
    #[sea_orm(string_value = "PAID")]
    Paid,
}

impl PaymentStatus {
    /// Derives the status from the paid total and the invoice amount.
    #[must_use]
    pub fn from_totals(paid_amount: f64, amount: f64) -> Self {
        if paid_amount >= amount && paid_amount > 0.0 {
            Self::Paid
        } else if paid_amount > 0.0 {
            Self::PartialPaid
        } else {
            Self::Unpaid
        }
    }
}

/// How an invoice payment was settled.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Bank transfer
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
    /// Cash
    #[sea_orm(string_value = "CASH")]
    Cash,
    /// Giro / cheque
    #[sea_orm(string_value = "GIRO")]
    Giro,
    /// Anything else
    #[sea_orm(string_value = "OTHER")]
    Other,
}

/// Billing stage an invoice represents.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    /// Down payment
    #[sea_orm(string_value = "DP")]
    Dp,
    /// Final settlement
    #[sea_orm(string_value = "FINAL_PAYMENT")]
    FinalPayment,
    /// Term of payment 1
    #[sea_orm(string_value = "TOP_1")]
    Top1,
    /// Term of payment 2
    #[sea_orm(string_value = "TOP_2")]
    Top2,
    /// Term of payment 3
    #[sea_orm(string_value = "TOP_3")]
    Top3,
    /// Meal allowance
    #[sea_orm(string_value = "MEALS")]
    Meals,
    /// Additional work
    #[sea_orm(string_value = "ADDITIONAL")]
    Additional,
}

/// Lifecycle of a project.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    /// Work in progress
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Finished
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Hidden from day-to-day views
    #[sea_orm(string_value = "ARCHIVED")]
    Archived,
}

/// Role of a user in the organisation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Site supervisor; limited to projects they are a member of
    #[sea_orm(string_value = "SPV")]
    Spv,
    /// Finance staff; approves and records payments
    #[sea_orm(string_value = "FINANCE")]
    Finance,
    /// Business owner
    #[sea_orm(string_value = "OWNER")]
    Owner,
}

impl UserRole {
    /// Roles that review newly submitted items.
    pub const REVIEWERS: [Self; 2] = [Self::Finance, Self::Owner];
}

/// Action recorded in the audit trail.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Entity created
    #[sea_orm(string_value = "CREATE")]
    Create,
    /// Entity modified
    #[sea_orm(string_value = "UPDATE")]
    Update,
    /// Entity approved
    #[sea_orm(string_value = "APPROVE")]
    Approve,
    /// Entity rejected
    #[sea_orm(string_value = "REJECT")]
    Reject,
    /// Entity removed
    #[sea_orm(string_value = "DELETE")]
    Delete,
}

/// Category of a notification, also used as the live event type.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// A new expense awaits review
    #[sea_orm(string_value = "EXPENSE_CREATED")]
    ExpenseCreated,
    /// An expense was approved
    #[sea_orm(string_value = "EXPENSE_APPROVED")]
    ExpenseApproved,
    /// An expense was rejected
    #[sea_orm(string_value = "EXPENSE_REJECTED")]
    ExpenseRejected,
    /// A new budget request awaits review
    #[sea_orm(string_value = "BUDGET_REQUEST")]
    BudgetRequest,
    /// A budget request was approved
    #[sea_orm(string_value = "BUDGET_APPROVED")]
    BudgetApproved,
    /// A budget request was rejected
    #[sea_orm(string_value = "BUDGET_REJECTED")]
    BudgetRejected,
    /// A new invoice awaits review
    #[sea_orm(string_value = "INVOICE_CREATED")]
    InvoiceCreated,
    /// An invoice was approved
    #[sea_orm(string_value = "INVOICE_APPROVED")]
    InvoiceApproved,
    /// An invoice was rejected
    #[sea_orm(string_value = "INVOICE_REJECTED")]
    InvoiceRejected,
    /// A payment was recorded against an invoice
    #[sea_orm(string_value = "PAYMENT_RECORDED")]
    PaymentRecorded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_from_totals() {
        assert_eq!(PaymentStatus::from_totals(0.0, 1000.0), PaymentStatus::Unpaid);
        assert_eq!(
            PaymentStatus::from_totals(900.0, 1000.0),
            PaymentStatus::PartialPaid
        );
        assert_eq!(PaymentStatus::from_totals(1000.0, 1000.0), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_totals(1200.0, 1000.0), PaymentStatus::Paid);
    }

    #[test]
    fn test_approval_status_terminality() {
        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_string_values() {
        assert_eq!(ApprovalStatus::Approved.to_value(), "APPROVED");
        assert_eq!(PaymentStatus::PartialPaid.to_value(), "PARTIAL_PAID");
        assert_eq!(InvoiceType::Top2.to_value(), "TOP_2");
        assert_eq!(NotificationType::BudgetApproved.to_value(), "BUDGET_APPROVED");
    }
}
