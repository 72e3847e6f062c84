use std::fmt;
use std::io::{self, Write};

use colored::Colorize;

use crate::domain::{LockPhase, MonthLockState, SettlementReport};

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Section,
}

fn styled(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()).bold().to_string(),
        MessageKind::Success => format!("[ok] {text}").bright_green().to_string(),
        MessageKind::Warning => format!("[!] {text}").bright_yellow().to_string(),
        MessageKind::Info => text,
    }
}

pub fn print(out: &mut dyn Write, kind: MessageKind, message: impl fmt::Display) -> io::Result<()> {
    writeln!(out, "{}", styled(kind, message))
}

fn money(value: f64) -> String {
    // Avoid printing "-0.00" for balances that cancel out.
    let value = if value.abs() < 0.005 { 0.0 } else { value };
    format!("{value:.2}")
}

fn balance_cell(value: f64, width: usize) -> String {
    let cell = format!("{:>width$}", money(value));
    if value < -0.005 {
        cell.bright_red().to_string()
    } else if value > 0.005 {
        cell.bright_green().to_string()
    } else {
        cell
    }
}

pub fn render_report(
    out: &mut dyn Write,
    report: &SettlementReport,
    currency: &str,
) -> io::Result<()> {
    print(out, MessageKind::Section, format!("Settlement {}", report.month))?;
    writeln!(
        out,
        "Shared costs: {} {currency} | Groceries: {} {currency} | Meal units: {} | Meal rate: {}",
        money(report.total_service_cost),
        money(report.total_grocery_cost),
        money(report.total_meal_units),
        money(report.meal_rate),
    )?;
    if report.members.is_empty() {
        return print(out, MessageKind::Warning, "No active members for this month.");
    }

    writeln!(
        out,
        "{:<18} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Member", "Meals", "Meal cost", "Service", "House pd", "Meal pd", "House bal", "Meal bal",
        "Balance"
    )?;
    let mut members: Vec<_> = report.members.values().collect();
    members.sort_by(|a, b| a.name.cmp(&b.name).then(a.member_id.cmp(&b.member_id)));
    for member in members {
        let mut name = member.name.clone();
        if member.departed {
            name.push_str(" (left)");
        }
        writeln!(
            out,
            "{:<18} {:>8} {:>10} {:>10} {:>10} {:>10} {} {} {}",
            name,
            money(member.meal_units),
            money(member.meal_cost),
            money(member.service_share),
            money(member.house_paid),
            money(member.meal_paid),
            balance_cell(member.house_balance, 10),
            balance_cell(member.meal_balance, 10),
            balance_cell(member.net_balance, 10),
        )?;
    }
    Ok(())
}

pub fn render_lock(
    out: &mut dyn Write,
    state: Option<&MonthLockState>,
) -> io::Result<()> {
    let phase = LockPhase::of(state);
    let kind = if phase.accepts_writes() {
        MessageKind::Success
    } else {
        MessageKind::Warning
    };
    match state {
        None => print(out, kind, format!("{phase} (no lock history)")),
        Some(state) => {
            print(out, kind, phase)?;
            if let Some(expiry) = state.unlock_expiry {
                writeln!(out, "Auto-relock after: {}", expiry.to_rfc3339())?;
            }
            Ok(())
        }
    }
}
