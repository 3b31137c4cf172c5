use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical silver table identities
///
/// Every cleaner output, validator call and quality issue is keyed by one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    BusinessProduct,
    CustomerUser,
    CustomerUserJob,
    CustomerUserCreditCard,
    EnterpriseMerchant,
    EnterpriseStaff,
    EnterpriseOrderMerchantTx,
    OperationsOrders,
    OperationsLineItems,
    OperationsOrderDelays,
    MarketingCampaign,
    MarketingTransactionalCampaign,
}

impl TableId {
    pub const ALL: [TableId; 12] = [
        TableId::BusinessProduct,
        TableId::CustomerUser,
        TableId::CustomerUserJob,
        TableId::CustomerUserCreditCard,
        TableId::EnterpriseMerchant,
        TableId::EnterpriseStaff,
        TableId::EnterpriseOrderMerchantTx,
        TableId::OperationsOrders,
        TableId::OperationsLineItems,
        TableId::OperationsOrderDelays,
        TableId::MarketingCampaign,
        TableId::MarketingTransactionalCampaign,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TableId::BusinessProduct => "business_product",
            TableId::CustomerUser => "customer_user",
            TableId::CustomerUserJob => "customer_user_job",
            TableId::CustomerUserCreditCard => "customer_user_credit_card",
            TableId::EnterpriseMerchant => "enterprise_merchant",
            TableId::EnterpriseStaff => "enterprise_staff",
            TableId::EnterpriseOrderMerchantTx => "enterprise_order_merchant_tx",
            TableId::OperationsOrders => "operations_orders",
            TableId::OperationsLineItems => "operations_line_items",
            TableId::OperationsOrderDelays => "operations_order_delays",
            TableId::MarketingCampaign => "marketing_campaign",
            TableId::MarketingTransactionalCampaign => "marketing_transactional_campaign",
        }
    }

    /// File name of the canonical silver output
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name(), crate::constants::PARQUET_EXTENSION)
    }

    /// Tables whose per-file results are accumulated and written once at end of run
    pub fn is_buffered(&self) -> bool {
        matches!(self, TableId::OperationsLineItems)
    }

    pub fn from_name(name: &str) -> Option<TableId> {
        TableId::ALL.iter().copied().find(|t| t.name() == name)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
