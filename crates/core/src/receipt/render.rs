//! Receipt and EOD summary renderers.
//!
//! Layout is fixed A4 portrait. All user-facing labels go through the
//! injected translator so the i18n table stays a collaborator; values are
//! drawn with a script-appropriate font.

use rust_decimal::Decimal;

use crate::eod::{IncomeReport, StockReport, VerificationRow};
use crate::ledger::LedgerEntry;

use super::canvas::{Canvas, CanvasError};
use super::font::{detect_script, Font};

const MARGIN: Decimal = Decimal::from_parts(40, 0, 0, false, 0);
const PAGE_BOTTOM: Decimal = Decimal::from_parts(800, 0, 0, false, 0);
const LINE_HEIGHT: Decimal = Decimal::from_parts(16, 0, 0, false, 0);
const HEADING_SIZE: Decimal = Decimal::from_parts(14, 0, 0, false, 0);
const BODY_SIZE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

struct Cursor {
    y: Decimal,
}

impl Cursor {
    fn new() -> Self {
        Self { y: MARGIN }
    }

    fn line<C: Canvas>(
        &mut self,
        canvas: &mut C,
        text: &str,
        size: Decimal,
    ) -> Result<(), CanvasError> {
        if self.y > PAGE_BOTTOM {
            canvas.page_break()?;
            self.y = MARGIN;
        }
        canvas.text(MARGIN, self.y, text, detect_script(text), size)?;
        self.y += LINE_HEIGHT;
        Ok(())
    }

    fn pair<C: Canvas>(
        &mut self,
        canvas: &mut C,
        label: &str,
        value: &str,
    ) -> Result<(), CanvasError> {
        if self.y > PAGE_BOTTOM {
            canvas.page_break()?;
            self.y = MARGIN;
        }
        canvas.text(MARGIN, self.y, label, detect_script(label), BODY_SIZE)?;
        canvas.text(
            MARGIN + Decimal::from_parts(180, 0, 0, false, 0),
            self.y,
            value,
            detect_script(value),
            BODY_SIZE,
        )?;
        self.y += LINE_HEIGHT;
        Ok(())
    }
}

/// Renders a single-exchange receipt.
pub fn render_exchange_receipt<C: Canvas>(
    canvas: &mut C,
    entries: &[LedgerEntry],
    branch_name: &str,
    translate: &dyn Fn(&str) -> String,
) -> Result<(), CanvasError> {
    let mut cursor = Cursor::new();
    cursor.line(canvas, &translate("receipt.title"), HEADING_SIZE)?;
    cursor.line(canvas, branch_name, BODY_SIZE)?;

    for entry in entries {
        cursor.pair(canvas, &translate("receipt.transaction_no"), &entry.transaction_no)?;
        cursor.pair(
            canvas,
            &translate("receipt.date"),
            &entry.transaction_date.format("%Y-%m-%d").to_string(),
        )?;
        cursor.pair(canvas, &translate("receipt.currency"), &entry.currency)?;
        cursor.pair(canvas, &translate("receipt.amount"), &entry.amount.to_string())?;
        cursor.pair(canvas, &translate("receipt.rate"), &entry.rate.to_string())?;
        cursor.pair(
            canvas,
            &translate("receipt.local_amount"),
            &entry.local_amount.to_string(),
        )?;
        if let Some(name) = &entry.customer_name {
            cursor.pair(canvas, &translate("receipt.customer"), name)?;
        }
        cursor.pair(
            canvas,
            &translate("receipt.balance_after"),
            &entry.balance_after.to_string(),
        )?;
    }
    Ok(())
}

/// Renders a reversal receipt referencing the voided entry.
pub fn render_reversal_receipt<C: Canvas>(
    canvas: &mut C,
    reversal: &LedgerEntry,
    branch_name: &str,
    translate: &dyn Fn(&str) -> String,
) -> Result<(), CanvasError> {
    let mut cursor = Cursor::new();
    cursor.line(canvas, &translate("receipt.reversal_title"), HEADING_SIZE)?;
    cursor.line(canvas, branch_name, BODY_SIZE)?;
    cursor.pair(
        canvas,
        &translate("receipt.transaction_no"),
        &reversal.transaction_no,
    )?;
    if let Some(original) = &reversal.original_transaction_no {
        cursor.pair(canvas, &translate("receipt.original_transaction_no"), original)?;
    }
    cursor.pair(canvas, &translate("receipt.currency"), &reversal.currency)?;
    cursor.pair(canvas, &translate("receipt.amount"), &reversal.amount.to_string())?;
    cursor.pair(
        canvas,
        &translate("receipt.local_amount"),
        &reversal.local_amount.to_string(),
    )?;
    Ok(())
}

/// Renders the step-6 EOD summary: income, stock, differences, cash-out.
pub fn render_eod_summary<C: Canvas>(
    canvas: &mut C,
    branch_name: &str,
    income: &IncomeReport,
    stock: &StockReport,
    verifications: &[VerificationRow],
    translate: &dyn Fn(&str) -> String,
) -> Result<(), CanvasError> {
    let mut cursor = Cursor::new();
    cursor.line(canvas, &translate("eod.summary_title"), HEADING_SIZE)?;
    cursor.line(canvas, branch_name, BODY_SIZE)?;

    cursor.line(canvas, &translate("eod.income_heading"), HEADING_SIZE)?;
    for row in &income.rows {
        cursor.pair(
            canvas,
            &row.currency,
            &format!(
                "{} / {} / {}",
                row.total_buy, row.total_sell, row.income
            ),
        )?;
    }
    cursor.pair(canvas, &translate("eod.total_income"), &income.total_income.to_string())?;

    cursor.line(canvas, &translate("eod.stock_heading"), HEADING_SIZE)?;
    for row in &stock.rows {
        cursor.pair(
            canvas,
            &row.currency,
            &format!("{} + {} = {}", row.opening, row.change, row.current),
        )?;
    }

    cursor.line(canvas, &translate("eod.difference_heading"), HEADING_SIZE)?;
    for row in verifications {
        cursor.pair(
            canvas,
            &row.currency,
            &format!(
                "{} / {} / {}",
                row.theoretical_balance, row.actual_balance, row.difference
            ),
        )?;
    }
    Ok(())
}
