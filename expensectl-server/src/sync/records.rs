//! Record conversion between the sync wire format and the repositories

use expensectl_core::sync::{BillItemUpload, ChangeRecord, ExpenseUpload, SyncModel, TemplateUpload};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::SyncError;
use crate::db::{BillItem, BillItemFields, ExpenseFields, TemplateFields};
use crate::models::{
    validate_money, Comment, Description, TemplateDescription, TemplateName, ValidationError, Vendor,
};

fn malformed(model: SyncModel, reason: impl ToString) -> SyncError {
    SyncError::Malformed {
        model,
        reason: reason.to_string(),
    }
}

fn parse<T: DeserializeOwned>(model: SyncModel, change: &ChangeRecord) -> Result<T, SyncError> {
    change.parse().map_err(|e| malformed(model, e))
}

/// Serialize a record for `changes.new`.
pub(crate) fn to_json<T: Serialize>(model: SyncModel, record: &T) -> Result<Value, SyncError> {
    serde_json::to_value(record).map_err(|e| malformed(model, e))
}

/// Bill items also carry their line amount.
pub(crate) fn bill_item_json(item: &BillItem) -> Result<Value, SyncError> {
    let mut value = to_json(SyncModel::BillItem, item)?;
    if let Value::Object(map) = &mut value {
        map.insert("amount".into(), to_json(SyncModel::BillItem, &item.amount())?);
    }
    Ok(value)
}

pub(crate) struct ExpenseChange {
    pub fields: ExpenseFields,
    pub is_bill: bool,
}

fn expense_fields(upload: &ExpenseUpload) -> Result<ExpenseFields, ValidationError> {
    Ok(ExpenseFields {
        date: upload.date,
        vendor: Vendor::new(&upload.vendor)?,
        category_id: upload.category_id,
        amount: validate_money("amount", upload.amount)?,
        description: Description::new(&upload.description)?,
    })
}

pub(crate) fn expense_change(change: &ChangeRecord) -> Result<ExpenseChange, SyncError> {
    let model = SyncModel::Expense;
    let upload: ExpenseUpload = parse(model, change)?;
    let fields = expense_fields(&upload).map_err(|e| malformed(model, e))?;

    Ok(ExpenseChange {
        fields,
        is_bill: upload.is_bill,
    })
}

pub(crate) struct BillItemChange {
    pub bill_id: i64,
    pub fields: BillItemFields,
}

pub(crate) fn bill_item_change(change: &ChangeRecord) -> Result<BillItemChange, SyncError> {
    let model = SyncModel::BillItem;
    let upload: BillItemUpload = parse(model, change)?;
    let fields = BillItemFields::new(&upload.product, upload.serving, upload.count, upload.unit_price)
        .map_err(|e| malformed(model, e))?;
    Ok(BillItemChange {
        bill_id: upload.bill_id,
        fields,
    })
}

pub(crate) fn template_change(change: &ChangeRecord) -> Result<TemplateFields, SyncError> {
    let model = SyncModel::ExpenseTemplate;
    let upload: TemplateUpload = parse(model, change)?;
    template_fields(&upload).map_err(|e| malformed(model, e))
}

fn template_fields(upload: &TemplateUpload) -> Result<TemplateFields, ValidationError> {
    Ok(TemplateFields {
        name: TemplateName::new(&upload.name)?,
        vendor: Vendor::new(&upload.vendor)?,
        category_id: upload.category_id,
        kind: upload.kind,
        amount: upload.amount.map(|a| validate_money("amount", a)).transpose()?,
        description: TemplateDescription::new(&upload.description)?,
        comment: Comment::new(&upload.comment)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ChangeRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn expense_upload_is_validated() {
        let change = record(json!({
            "local_id": 5,
            "date": "2024-03-01",
            "vendor": "  Bakery ",
            "category_id": 3,
            "amount": "4.20",
        }));
        let parsed = expense_change(&change).unwrap();
        assert_eq!(parsed.fields.vendor.as_str(), "Bakery");
        assert!(!parsed.is_bill);

        let too_long = record(json!({
            "local_id": 6,
            "date": "2024-03-01",
            "vendor": "x".repeat(41),
            "category_id": 3,
            "amount": 1,
        }));
        assert!(matches!(
            expense_change(&too_long),
            Err(SyncError::Malformed { model: SyncModel::Expense, .. })
        ));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let change = record(json!({"local_id": "a", "product": "Milk"}));
        assert!(matches!(bill_item_change(&change), Err(SyncError::Malformed { .. })));
    }

    #[test]
    fn template_kind_defaults_to_simple() {
        let change = record(json!({
            "local_id": 1,
            "name": "Bus",
            "vendor": "Transit",
            "category_id": 2,
            "amount": 3.4,
            "description": "Ticket",
        }));
        let fields = template_change(&change).unwrap();
        assert_eq!(fields.kind, expensectl_core::TemplateKind::Simple);
    }
}
