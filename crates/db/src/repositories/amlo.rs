//! AMLO repository: reservation lifecycle and report submission.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use satang_core::amlo::{
    age_days, classify, format_report_no, AuditAction, OverdueClass, ReportType, ReservationStatus,
};
use satang_core::ledger::TradeDirection;
use satang_shared::types::{PageRequest, PageResponse};
use satang_shared::{AppError, AppResult};

use crate::convert::{
    direction_str, parse_report_type, parse_reservation_status, report_type_str,
    reservation_status_str,
};
use crate::entities::{amlo_reports, amlo_reservations, branches};

use super::db_err;

/// Input for taking a new reservation at the counter.
#[derive(Debug, Clone)]
pub struct CreateReservationInput {
    /// Owning branch.
    pub branch_id: Uuid,
    /// Operator taking the reservation.
    pub created_by: Uuid,
    /// Customer display name.
    pub customer_name: String,
    /// Customer document id.
    pub customer_id: String,
    /// Amount of the underlying trade, base currency.
    pub amount: Decimal,
    /// Foreign currency of the underlying trade.
    pub currency: String,
    /// Direction of the underlying trade.
    pub direction: TradeDirection,
    /// Regulator form type.
    pub report_type: ReportType,
    /// Opaque PDF field payload keyed by widget name.
    pub form_data: serde_json::Value,
}

/// An unreported row with its age classification.
#[derive(Debug, Clone)]
pub struct OverdueReport {
    /// The report row.
    pub report: amlo_reports::Model,
    /// The originating reservation.
    pub reservation: amlo_reservations::Model,
    /// Whole days since the report row was created.
    pub age_days: i64,
    /// Rendering classification.
    pub class: OverdueClass,
}

/// Per-report result of a batch submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// Report id.
    pub report_id: Uuid,
    /// `None` on success, otherwise why this row was skipped.
    pub skipped: Option<String>,
}

/// AMLO repository.
#[derive(Debug, Clone)]
pub struct AmloRepository {
    db: DatabaseConnection,
}

impl AmloRepository {
    /// Creates a new AMLO repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Takes a new reservation and assigns its report number.
    pub async fn create(
        &self,
        institution_code: &str,
        input: CreateReservationInput,
    ) -> AppResult<amlo_reservations::Model> {
        let branch = branches::Entity::find_by_id(input.branch_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("branch {}", input.branch_id)))?;

        let today = Utc::now().date_naive();
        let serial = self.next_serial(input.branch_id, today).await?;
        let serial_no = u32::try_from(serial)
            .map_err(|_| AppError::InternalFailure("reservation serial overflow".to_string()))?;
        let reservation_no = format_report_no(
            institution_code,
            &branch.code,
            today,
            serial_no,
            Some(&input.currency),
        );

        let now = Utc::now();
        let active = amlo_reservations::ActiveModel {
            id: Set(Uuid::now_v7()),
            reservation_no: Set(reservation_no),
            serial: Set(serial),
            branch_id: Set(input.branch_id),
            customer_name: Set(input.customer_name),
            customer_id: Set(input.customer_id),
            amount: Set(input.amount),
            currency: Set(input.currency),
            direction: Set(direction_str(input.direction).to_string()),
            report_type: Set(report_type_str(input.report_type).to_string()),
            status: Set(reservation_status_str(ReservationStatus::Pending).to_string()),
            rejection_reason: Set(None),
            audited_by: Set(None),
            created_by: Set(input.created_by),
            linked_transaction_id: Set(None),
            form_data: Set(input.form_data),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        active.insert(&self.db).await.map_err(db_err)
    }

    /// The next report serial for the branch's current year.
    ///
    /// Derived from the highest serial already issued, never from a row
    /// count, so removed rows can never cause a number to be reused.
    async fn next_serial(&self, branch_id: Uuid, today: NaiveDate) -> AppResult<i32> {
        let year_start = Utc
            .with_ymd_and_hms(today.year(), 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| AppError::InternalFailure("invalid year start".to_string()))?;
        let newest = amlo_reservations::Entity::find()
            .filter(amlo_reservations::Column::BranchId.eq(branch_id))
            .filter(amlo_reservations::Column::CreatedAt.gte(year_start))
            .order_by_desc(amlo_reservations::Column::Serial)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(serial_after(newest.map(|m| m.serial)))
    }

    /// Loads one reservation.
    pub async fn get(&self, id: Uuid) -> AppResult<amlo_reservations::Model> {
        amlo_reservations::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("reservation {id}")))
    }

    /// Lists a branch's reservations, newest first.
    pub async fn list(
        &self,
        branch_id: Uuid,
        status: Option<ReservationStatus>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<amlo_reservations::Model>> {
        let mut query = amlo_reservations::Entity::find()
            .filter(amlo_reservations::Column::BranchId.eq(branch_id));
        if let Some(status) = status {
            query = query.filter(
                amlo_reservations::Column::Status.eq(reservation_status_str(status)),
            );
        }
        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let data = query
            .order_by_desc(amlo_reservations::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    fn status_of(model: &amlo_reservations::Model) -> AppResult<ReservationStatus> {
        parse_reservation_status(&model.status).ok_or_else(|| {
            AppError::InternalFailure(format!("unknown reservation status {:?}", model.status))
        })
    }

    /// Applies an auditor decision. Approval emits the companion report
    /// row that the submission batch later picks up.
    pub async fn audit(
        &self,
        id: Uuid,
        action: AuditAction,
        rejection_reason: Option<&str>,
        audited_by: Uuid,
    ) -> AppResult<amlo_reservations::Model> {
        let model = self.get(id).await?;
        let next = Self::status_of(&model)?.audit(action, rejection_reason)?;

        let report_type = parse_report_type(&model.report_type).ok_or_else(|| {
            AppError::InternalFailure(format!("unknown report type {:?}", model.report_type))
        })?;
        let amount = model.amount;

        let mut active: amlo_reservations::ActiveModel = model.into();
        active.status = Set(reservation_status_str(next).to_string());
        active.rejection_reason = Set(rejection_reason.map(str::to_string));
        active.audited_by = Set(Some(audited_by));
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.db).await.map_err(db_err)?;

        if next == ReservationStatus::Approved {
            let report = amlo_reports::ActiveModel {
                id: Set(Uuid::now_v7()),
                reservation_id: Set(id),
                report_type: Set(report_type_str(report_type).to_string()),
                transaction_amount: Set(amount),
                transaction_date: Set(Utc::now().date_naive()),
                is_reported: Set(false),
                report_time: Set(None),
                reported_by: Set(None),
                pdf_filename: Set(None),
                created_at: Set(Utc::now().into()),
            };
            report.insert(&self.db).await.map_err(db_err)?;
        }
        Ok(updated)
    }

    /// Returns an audited reservation to pending and deletes the
    /// companion report row a prior approval created.
    pub async fn reverse_audit(&self, id: Uuid) -> AppResult<amlo_reservations::Model> {
        let model = self.get(id).await?;
        let next = Self::status_of(&model)?.reverse_audit()?;

        let reports = model
            .find_related(amlo_reports::Entity)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        for report in reports {
            if report.is_reported {
                return Err(AppError::ValidationFailed(format!(
                    "reservation {id} was already submitted to the regulator"
                )));
            }
            report.delete(&self.db).await.map_err(db_err)?;
        }

        let mut active: amlo_reservations::ActiveModel = model.into();
        active.status = Set(reservation_status_str(next).to_string());
        active.rejection_reason = Set(None);
        active.audited_by = Set(None);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(db_err)
    }

    /// Marks the underlying trade finalised and links the ledger row.
    pub async fn complete(
        &self,
        id: Uuid,
        linked_transaction_id: Uuid,
    ) -> AppResult<amlo_reservations::Model> {
        let model = self.get(id).await?;
        let next = Self::status_of(&model)?.complete()?;

        let mut active: amlo_reservations::ActiveModel = model.into();
        active.status = Set(reservation_status_str(next).to_string());
        active.linked_transaction_id = Set(Some(linked_transaction_id));
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(db_err)
    }

    /// The customer's most recent reservation still working through the
    /// pipeline at this branch, so the counter can pre-fill or block.
    pub async fn open_reservation(
        &self,
        branch_id: Uuid,
        customer_id: &str,
    ) -> AppResult<Option<amlo_reservations::Model>> {
        amlo_reservations::Entity::find()
            .filter(amlo_reservations::Column::BranchId.eq(branch_id))
            .filter(amlo_reservations::Column::CustomerId.eq(customer_id))
            .filter(amlo_reservations::Column::Status.ne("completed"))
            .order_by_desc(amlo_reservations::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Lists every unreported row with its age classification.
    pub async fn overdue(&self, branch_id: Option<Uuid>) -> AppResult<Vec<OverdueReport>> {
        let reports = amlo_reports::Entity::find()
            .filter(amlo_reports::Column::IsReported.eq(false))
            .order_by_asc(amlo_reports::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let now = Utc::now();
        let mut out = Vec::with_capacity(reports.len());
        for report in reports {
            let reservation = self.get(report.reservation_id).await?;
            if branch_id.is_some_and(|b| reservation.branch_id != b) {
                continue;
            }
            let age = age_days(report.created_at.to_utc(), now);
            out.push(OverdueReport {
                report,
                reservation,
                age_days: age,
                class: classify(age),
            });
        }
        Ok(out)
    }

    /// Batch-submits reports to the regulator.
    ///
    /// Each id succeeds or is skipped independently; one bad id never
    /// fails the batch.
    pub async fn mark_reported(
        &self,
        report_ids: &[Uuid],
        reported_by: Uuid,
    ) -> AppResult<Vec<SubmitOutcome>> {
        let mut outcomes = Vec::with_capacity(report_ids.len());
        for &report_id in report_ids {
            let model = amlo_reports::Entity::find_by_id(report_id)
                .one(&self.db)
                .await
                .map_err(db_err)?;
            let Some(model) = model else {
                outcomes.push(SubmitOutcome {
                    report_id,
                    skipped: Some("report not found".to_string()),
                });
                continue;
            };
            if model.is_reported {
                outcomes.push(SubmitOutcome {
                    report_id,
                    skipped: Some("already reported".to_string()),
                });
                continue;
            }
            let mut active: amlo_reports::ActiveModel = model.into();
            active.is_reported = Set(true);
            active.report_time = Set(Some(Utc::now().into()));
            active.reported_by = Set(Some(reported_by));
            active.update(&self.db).await.map_err(db_err)?;
            outcomes.push(SubmitOutcome {
                report_id,
                skipped: None,
            });
        }
        Ok(outcomes)
    }

    /// Loads one report row.
    pub async fn get_report(&self, report_id: Uuid) -> AppResult<amlo_reports::Model> {
        amlo_reports::Entity::find_by_id(report_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("report {report_id}")))
    }

    /// Records the rendered form's filename on a report row.
    pub async fn set_pdf_filename(&self, report_id: Uuid, filename: &str) -> AppResult<()> {
        let model = self.get_report(report_id).await?;
        let mut active: amlo_reports::ActiveModel = model.into();
        active.pdf_filename = Set(Some(filename.to_string()));
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}

const fn serial_after(highest_issued: Option<i32>) -> i32 {
    match highest_issued {
        Some(serial) => serial + 1,
        None => 1,
    }
}
