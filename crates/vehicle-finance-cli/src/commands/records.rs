use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use vehicle_finance_core::amortization::schedule;
use vehicle_finance_core::records::{
    credit_profile_for_owner, InMemoryRecordStore, LoanRecord, LoanRecordInput, LoanRecordUpdate,
    RecordStore, StoreConfig,
};

use crate::input;

#[derive(Subcommand)]
pub enum RecordCommand {
    /// Create a loan record (EMI is computed and stored)
    Add(AddArgs),
    /// List loan records, optionally for one owner
    List(ListArgs),
    /// Show one record with its progress summary
    Show(IdArgs),
    /// Edit a record; the EMI is recomputed
    Update(UpdateArgs),
    /// Delete a record
    Delete(IdArgs),
    /// Mark one installment of a record paid
    Pay(PayArgs),
    /// Credit profile across all records of an owner
    Profile(ProfileArgs),
}

#[derive(Args)]
pub struct AddArgs {
    /// Path to JSON/YAML file with the record fields
    #[arg(long)]
    pub input: Option<String>,

    /// Borrower name
    #[arg(long)]
    pub name: Option<String>,

    /// Vehicle name
    #[arg(long)]
    pub vehicle: Option<String>,

    /// Owner email
    #[arg(long)]
    pub email: Option<String>,

    /// Vehicle image URL
    #[arg(long)]
    pub image_url: Option<String>,

    /// Amount financed
    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Term in months
    #[arg(long, alias = "months")]
    pub term: Option<u32>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only records owned by this email
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Args)]
pub struct IdArgs {
    /// Record id
    pub id: String,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Record id
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub vehicle: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub image_url: Option<String>,

    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Must match the record's current term
    #[arg(long, alias = "months")]
    pub term: Option<u32>,

    /// Only apply if the record is still at this version
    #[arg(long)]
    pub if_version: Option<u64>,
}

#[derive(Args)]
pub struct PayArgs {
    /// Record id
    pub id: String,

    /// Installment number, counting from 1
    pub number: usize,
}

#[derive(Args)]
pub struct ProfileArgs {
    /// Owner email
    pub email: String,
}

pub fn run_record(cmd: RecordCommand, config: &StoreConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let store = InMemoryRecordStore::from_config(config);

    match cmd {
        RecordCommand::Add(args) => {
            let record_input = read_add_input(args)?;
            let record = store.create(record_input)?;
            Ok(serde_json::to_value(record)?)
        }
        RecordCommand::List(args) => {
            let records = match args.email.as_deref() {
                Some(email) => store.get_by_owner(email)?,
                None => store.get_all()?,
            };
            let rows: Vec<Value> = records.iter().map(list_row).collect();
            Ok(Value::Array(rows))
        }
        RecordCommand::Show(args) => {
            let record = store.get_by_id(&args.id)?;
            Ok(detail(&record))
        }
        RecordCommand::Update(args) => {
            let update = LoanRecordUpdate {
                name: args.name,
                vehicle_name: args.vehicle,
                email: args.email,
                image_url: args.image_url,
                principal: args.principal,
                annual_interest_rate_percent: args.annual_rate,
                term_months: args.term,
                expected_version: args.if_version,
            };
            let record = store.update(&args.id, update)?;
            Ok(detail(&record))
        }
        RecordCommand::Delete(args) => {
            let record = store.delete(&args.id)?;
            Ok(json!({ "deleted": record.id }))
        }
        RecordCommand::Pay(args) => {
            let index = args
                .number
                .checked_sub(1)
                .ok_or("installment numbers count from 1")?;
            let record = store.mark_installment_paid(&args.id, index)?;
            Ok(detail(&record))
        }
        RecordCommand::Profile(args) => {
            let profile = credit_profile_for_owner(&store, &args.email)?;
            let mut out = serde_json::to_value(profile)?;
            out["email"] = Value::String(args.email);
            Ok(out)
        }
    }
}

fn read_add_input(args: AddArgs) -> Result<LoanRecordInput, Box<dyn std::error::Error>> {
    input::resolve(args.input.as_deref(), || {
        Ok(LoanRecordInput {
            name: args.name.ok_or("--name is required (or provide --input)")?,
            vehicle_name: args.vehicle.ok_or("--vehicle is required (or provide --input)")?,
            email: args.email.ok_or("--email is required (or provide --input)")?,
            image_url: args.image_url,
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_interest_rate_percent: args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            term_months: args.term.ok_or("--term is required (or provide --input)")?,
        })
    })
}

fn list_row(record: &LoanRecord) -> Value {
    let progress = record.progress();
    json!({
        "id": record.id,
        "name": record.name,
        "vehicle": record.vehicle_name,
        "email": record.email,
        "principal": record.principal,
        "monthly_installment": record.monthly_installment,
        "paid": format!("{}/{}", progress.paid_count, progress.total_count),
        "percent": progress.percent,
        "status": record.status(),
    })
}

fn detail(record: &LoanRecord) -> Value {
    let paid = record.progress().paid_count as u32;
    // Counts paid installments, not which ones; exact when paid in order.
    let outstanding = schedule::remaining_balance(&record.terms(), paid).ok();
    json!({
        "record": record,
        "summary": record.summary(),
        "interest": record.interest_summary(),
        "outstanding_principal": outstanding,
    })
}
