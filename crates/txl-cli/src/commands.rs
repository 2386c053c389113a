use std::io::Write;

use colored::Colorize;
use serde::Serialize;
use txl_ledger::{
    transaction_hash, AuditLog, InvocationContext, LedgerEngine, LedgerReader, LedgerWriter,
    NewAuditLog, NewTransaction, Transaction,
};
use txl_store::JournalStore;

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(
    command: Command,
    config: &CliConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let store = JournalStore::open(&config.store_path, config.journal())?;
    tracing::debug!(path = %config.store_path.display(), records = store.len(), "journal opened");
    let engine = LedgerEngine::new(store);
    let ctx = InvocationContext::new();
    let printer = Printer {
        format: config.format,
    };

    match command {
        Command::Tx(TxCommand::Create(args)) => {
            let tx = engine.create_transaction(&ctx, args.into_new())?;
            printer.transaction(out, &tx)
        }
        Command::Tx(TxCommand::Show { id }) => {
            let tx = engine.get_transaction(&ctx, &id)?;
            printer.transaction(out, &tx)
        }
        Command::Tx(TxCommand::Exists { id }) => {
            let exists = engine.transaction_exists(&ctx, &id)?;
            printer.exists(out, &id, exists)
        }
        Command::Tx(TxCommand::History { id }) => {
            let history = engine.transaction_history(&ctx, &id)?;
            printer.list(out, &history, Printer::transaction)
        }
        Command::Tx(TxCommand::Account { account_id, limit }) => {
            let txs = engine.account_transactions(&ctx, &account_id, Some(limit))?;
            printer.list(out, &txs, Printer::transaction)
        }
        Command::Tx(TxCommand::Hash { id }) => {
            let tx = engine.get_transaction(&ctx, &id)?;
            printer.hash(out, &id, &transaction_hash(&tx)?)
        }
        Command::Tx(TxCommand::Verify { id, expected_hash }) => {
            let valid = engine.verify_transaction(&ctx, &id, &expected_hash)?;
            printer.verified(out, &id, valid)
        }
        Command::Audit(AuditCommand::Create(args)) => {
            let entry = engine.create_audit_log(&ctx, args.into_new())?;
            printer.audit(out, &entry)
        }
        Command::Audit(AuditCommand::Show { id }) => {
            let entry = engine.get_audit_log(&ctx, &id)?;
            printer.audit(out, &entry)
        }
        Command::Audit(AuditCommand::History { id }) => {
            let history = engine.audit_log_history(&ctx, &id)?;
            printer.list(out, &history, Printer::audit)
        }
    }
}

impl TxCreateArgs {
    fn into_new(self) -> NewTransaction {
        NewTransaction {
            id: self.id,
            txn_type: self.txn_type,
            amount: self.amount,
            currency: self.currency,
            from_account: self.from,
            to_account: self.to,
            timestamp: self.timestamp,
            status: self.status,
            metadata: self.metadata,
        }
    }
}

impl AuditCreateArgs {
    fn into_new(self) -> NewAuditLog {
        NewAuditLog {
            id: self.id,
            action_type: self.action,
            actor_user_id: self.actor,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            before_value: self.before,
            after_value: self.after,
            timestamp: self.timestamp,
        }
    }
}

struct Printer {
    format: OutputFormat,
}

impl Printer {
    fn json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
        writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    fn transaction(&self, out: &mut dyn Write, tx: &Transaction) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            return Self::json(out, tx);
        }
        writeln!(out, "{} {}", "transaction".bold(), tx.id.yellow().bold())?;
        writeln!(out, "  {} {} {}", tx.txn_type.cyan(), tx.amount, tx.currency)?;
        writeln!(out, "  {} -> {}", or_dash(&tx.from_account), or_dash(&tx.to_account))?;
        writeln!(out, "  status:     {}", tx.status.green())?;
        writeln!(out, "  timestamp:  {}", tx.event_timestamp)?;
        if !tx.metadata.is_empty() {
            writeln!(out, "  metadata:   {}", tx.metadata.dimmed())?;
        }
        writeln!(out, "  provenance: {}", tx.provenance_id.dimmed())?;
        writeln!(out, "  recorded:   {}", tx.recorded_at)?;
        Ok(())
    }

    fn audit(&self, out: &mut dyn Write, entry: &AuditLog) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            return Self::json(out, entry);
        }
        writeln!(out, "{} {}", "audit".bold(), entry.id.yellow().bold())?;
        writeln!(
            out,
            "  {} by {} on {}/{}",
            entry.action_type.cyan(),
            entry.actor_user_id,
            entry.resource_type,
            entry.resource_id
        )?;
        writeln!(out, "  before:    {}", or_dash(&entry.before_value))?;
        writeln!(out, "  after:     {}", or_dash(&entry.after_value))?;
        writeln!(out, "  timestamp: {}", entry.event_timestamp)?;
        writeln!(out, "  recorded:  {}", entry.recorded_at)?;
        Ok(())
    }

    fn exists(&self, out: &mut dyn Write, id: &str, exists: bool) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            return Self::json(out, &serde_json::json!({ "id": id, "exists": exists }));
        }
        if exists {
            writeln!(out, "{} {} exists", "✓".green().bold(), id.yellow())?;
        } else {
            writeln!(out, "{} {} not found", "✗".red().bold(), id.yellow())?;
        }
        Ok(())
    }

    fn hash(&self, out: &mut dyn Write, id: &str, hash: &str) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            return Self::json(out, &serde_json::json!({ "id": id, "hash": hash }));
        }
        writeln!(out, "{}  {}", hash, id.yellow())?;
        Ok(())
    }

    fn verified(&self, out: &mut dyn Write, id: &str, valid: bool) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            return Self::json(out, &serde_json::json!({ "id": id, "valid": valid }));
        }
        if valid {
            writeln!(out, "{} {} matches", "✓".green().bold(), id.yellow())?;
        } else {
            writeln!(out, "{} {} does not match", "✗".red().bold(), id.yellow())?;
        }
        Ok(())
    }

    fn list<T: Serialize>(
        &self,
        out: &mut dyn Write,
        items: &[T],
        show: fn(&Self, &mut dyn Write, &T) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            return Self::json(out, items);
        }
        if items.is_empty() {
            writeln!(out, "No records.")?;
        }
        for item in items {
            show(self, out, item)?;
        }
        Ok(())
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}
