//! Wire types of the synchronization protocol.
//!
//! Offline clients send everything they changed since `last_sync` and get
//! back everything the server changed in the same window. Conflicts are
//! resolved last-write-wins; deletions travel as tombstones.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::templates::TemplateKind;

/// Models exchanged by the sync protocol, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncModel {
    Category,
    Expense,
    #[serde(rename = "billitem")]
    BillItem,
    #[serde(rename = "expensetemplate")]
    ExpenseTemplate,
}

impl SyncModel {
    pub const ALL: [SyncModel; 4] = [
        Self::Category,
        Self::Expense,
        Self::BillItem,
        Self::ExpenseTemplate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Expense => "expense",
            Self::BillItem => "billitem",
            Self::ExpenseTemplate => "expensetemplate",
        }
    }

    /// Categories are download-only; clients manage them through the
    /// dedicated category endpoints.
    pub fn accepts_uploads(&self) -> bool {
        !matches!(self, Self::Category)
    }
}

impl fmt::Display for SyncModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown sync model '{s}'"))
    }
}

/// Reference to a deleted (or to-be-deleted) object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRef {
    pub model: SyncModel,
    pub id: i64,
}

/// A record uploaded by a client. `id` is absent for new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub local_id: Value,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ChangeRecord {
    /// Decode the model-specific fields.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SyncRequest {
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deletions: Vec<DeletionRef>,
    #[serde(default)]
    pub changes: BTreeMap<SyncModel, Vec<ChangeRecord>>,
}

/// Acknowledges an uploaded record and tells the client its server id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub local_id: Value,
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletionsOut {
    pub new: Vec<DeletionRef>,
    pub ack: Vec<DeletionRef>,
    pub not_found: Vec<DeletionRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangesOut {
    pub new: BTreeMap<SyncModel, Vec<Value>>,
    pub ack: BTreeMap<SyncModel, Vec<Ack>>,
    pub deleted: Vec<DeletionRef>,
    pub not_found: Vec<DeletionRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub sync_date: DateTime<Utc>,
    pub deletions: DeletionsOut,
    pub changes: ChangesOut,
}

impl SyncResponse {
    /// A response with every model key present and nothing in it.
    pub fn empty(now: DateTime<Utc>) -> Self {
        let mut changes = ChangesOut::default();
        for model in SyncModel::ALL {
            changes.new.insert(model, Vec::new());
            changes.ack.insert(model, Vec::new());
        }
        Self {
            sync_date: now,
            deletions: DeletionsOut::default(),
            changes,
        }
    }
}

/// Uploaded expense fields
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExpenseUpload {
    pub date: NaiveDate,
    pub vendor: String,
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_bill: bool,
}

/// Uploaded bill item fields
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BillItemUpload {
    pub bill_id: i64,
    pub product: String,
    #[serde(default)]
    pub serving: Option<Decimal>,
    pub count: Decimal,
    pub unit_price: Decimal,
}

/// Uploaded expense template fields
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateUpload {
    pub name: String,
    pub vendor: String,
    pub category_id: i64,
    #[serde(rename = "type", default)]
    pub kind: TemplateKind,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_names() {
        assert_eq!(serde_json::to_value(SyncModel::BillItem).unwrap(), json!("billitem"));
        assert_eq!("expensetemplate".parse::<SyncModel>().unwrap(), SyncModel::ExpenseTemplate);
        assert!(!SyncModel::Category.accepts_uploads());
        assert!(SyncModel::Expense.accepts_uploads());
    }

    #[test]
    fn empty_response_has_every_model_key() {
        let now = "2024-05-01T12:00:00Z".parse().unwrap();
        let value = serde_json::to_value(SyncResponse::empty(now)).unwrap();
        for key in ["category", "expense", "billitem", "expensetemplate"] {
            assert_eq!(value["changes"]["new"][key], json!([]));
            assert_eq!(value["changes"]["ack"][key], json!([]));
        }
        assert_eq!(value["deletions"]["not_found"], json!([]));
    }

    #[test]
    fn initial_request_parses() {
        let req: SyncRequest = serde_json::from_value(json!({"last_sync": null})).unwrap();
        assert!(req.last_sync.is_none());
        assert!(req.changes.is_empty());
    }

    #[test]
    fn change_record_keeps_model_fields() {
        let req: SyncRequest = serde_json::from_value(json!({
            "last_sync": "2024-05-01T10:00:00+00:00",
            "deletions": [{"model": "expense", "id": 4}],
            "changes": {
                "expense": [{
                    "id": null,
                    "local_id": "L1",
                    "date": "2024-05-01",
                    "vendor": "Bakery",
                    "category_id": 3,
                    "amount": "4.20"
                }]
            }
        }))
        .unwrap();

        assert_eq!(req.deletions, vec![DeletionRef { model: SyncModel::Expense, id: 4 }]);
        let change = &req.changes[&SyncModel::Expense][0];
        assert_eq!(change.id, None);
        let upload: ExpenseUpload = change.parse().unwrap();
        assert_eq!(upload.vendor, "Bakery");
        assert_eq!(upload.amount, "4.20".parse().unwrap());
        assert!(!upload.is_bill);
    }

    #[test]
    fn unknown_model_is_rejected() {
        let result: Result<SyncRequest, _> =
            serde_json::from_value(json!({"last_sync": null, "changes": {"user": []}}));
        assert!(result.is_err());
    }
}
