use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::overlap::{check_overlap, OverlapConflict, Subject};
use crate::error::AppError;
use crate::models::assignment::{
    Assignment, AssignmentEvent, AssignmentEventKind, AssignmentPatch, NewAssignment,
};
use crate::repository::AssignmentFilter;
use crate::state::AppState;

pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct CreateAssignment {
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub async fn create_assignment(
    state: &AppState,
    company_id: Uuid,
    command: CreateAssignment,
) -> Result<Assignment, AppError> {
    let started = Instant::now();
    let result = create_inner(state, company_id, command).await;
    record_outcome(state, "create", started, &result);
    result
}

pub async fn update_assignment(
    state: &AppState,
    company_id: Uuid,
    id: Uuid,
    patch: AssignmentPatch,
) -> Result<Assignment, AppError> {
    let started = Instant::now();
    let result = update_inner(state, company_id, id, patch).await;
    record_outcome(state, "update", started, &result);
    result
}

pub async fn delete_assignment(
    state: &AppState,
    company_id: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    let started = Instant::now();
    let result = delete_inner(state, company_id, id).await;
    record_outcome(state, "delete", started, &result);
    result
}

async fn create_inner(
    state: &AppState,
    company_id: Uuid,
    command: CreateAssignment,
) -> Result<Assignment, AppError> {
    let driver_id = command
        .driver_id
        .ok_or_else(|| AppError::Validation("driverUuid is required".to_string()))?;
    let vehicle_id = command
        .vehicle_id
        .ok_or_else(|| AppError::Validation("vehicleUuid is required".to_string()))?;
    let start_date = command
        .start_date
        .ok_or_else(|| AppError::Validation("startDate is required".to_string()))?;

    ensure_date_order(start_date, command.end_date)?;

    let lock = state.company_write_lock(company_id);
    let _guard = lock.lock().await;

    ensure_no_overlap(
        state,
        company_id,
        driver_id,
        vehicle_id,
        start_date,
        command.end_date,
        None,
    )
    .await?;

    let assignment = state
        .assignments
        .insert(NewAssignment {
            company_id,
            driver_id,
            vehicle_id,
            start_date,
            end_date: command.end_date,
        })
        .await?;

    info!(
        assignment_id = %assignment.id,
        driver_id = %assignment.driver_id,
        vehicle_id = %assignment.vehicle_id,
        "assignment created"
    );
    publish(state, AssignmentEventKind::Created, &assignment);

    Ok(assignment)
}

async fn update_inner(
    state: &AppState,
    company_id: Uuid,
    id: Uuid,
    patch: AssignmentPatch,
) -> Result<Assignment, AppError> {
    let lock = state.company_write_lock(company_id);
    let _guard = lock.lock().await;

    let mut effective = state
        .assignments
        .get(company_id, id)
        .await?
        .ok_or_else(|| assignment_not_found(id))?;
    patch.apply_to(&mut effective);

    ensure_date_order(effective.start_date, effective.end_date)?;

    // Both subjects are re-checked on every update: moving either end of the
    // interval can reach a row that did not collide before.
    ensure_no_overlap(
        state,
        company_id,
        effective.driver_id,
        effective.vehicle_id,
        effective.start_date,
        effective.end_date,
        Some(id),
    )
    .await?;

    let assignment = state
        .assignments
        .patch(company_id, id, &patch)
        .await?
        .ok_or_else(|| assignment_not_found(id))?;

    info!(assignment_id = %assignment.id, "assignment updated");
    publish(state, AssignmentEventKind::Updated, &assignment);

    Ok(assignment)
}

async fn delete_inner(state: &AppState, company_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let assignment = state
        .assignments
        .get(company_id, id)
        .await?
        .ok_or_else(|| assignment_not_found(id))?;

    if !state.assignments.delete(company_id, id).await? {
        return Err(assignment_not_found(id));
    }

    info!(assignment_id = %id, "assignment deleted");
    publish(state, AssignmentEventKind::Deleted, &assignment);

    Ok(())
}

fn ensure_date_order(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), AppError> {
    match end {
        Some(end) if end < start => Err(AppError::InvalidDateRange(
            "endDate must not be earlier than startDate".to_string(),
        )),
        _ => Ok(()),
    }
}

async fn ensure_no_overlap(
    state: &AppState,
    company_id: Uuid,
    driver_id: Uuid,
    vehicle_id: Uuid,
    start: NaiveDate,
    end: Option<NaiveDate>,
    exclude_id: Option<Uuid>,
) -> Result<(), AppError> {
    let repo = state.assignments.as_ref();
    let checks = [(Subject::Driver, driver_id), (Subject::Vehicle, vehicle_id)];

    for (subject, subject_id) in checks {
        if let Some(conflict) =
            check_overlap(repo, company_id, subject, subject_id, start, end, exclude_id).await?
        {
            return Err(overlap_error(state, conflict));
        }
    }

    Ok(())
}

fn overlap_error(state: &AppState, conflict: OverlapConflict) -> AppError {
    warn!(
        subject = %conflict.subject,
        conflicting_assignment_id = %conflict.assignment_id,
        "assignment overlap rejected"
    );
    state
        .metrics
        .assignment_conflicts_total
        .with_label_values(&[conflict.subject.as_str()])
        .inc();
    AppError::AssignmentOverlap(conflict)
}

fn assignment_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("assignment {id} not found"))
}

fn publish(state: &AppState, kind: AssignmentEventKind, assignment: &Assignment) {
    let _ = state.assignment_events_tx.send(AssignmentEvent {
        company_id: assignment.company_id,
        kind,
        assignment: assignment.clone(),
    });
}

fn record_outcome<T>(
    state: &AppState,
    operation: &str,
    started: Instant,
    result: &Result<T, AppError>,
) {
    let outcome = match result {
        Ok(_) => "success",
        Err(AppError::Internal(_)) => "error",
        Err(_) => "rejected",
    };

    state
        .metrics
        .assignment_command_latency_seconds
        .with_label_values(&[operation])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .assignment_commands_total
        .with_label_values(&[operation, outcome])
        .inc();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    StartDate,
    EndDate,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentQuery {
    pub filter: AssignmentFilter,
    pub sort_by: SortBy,
    pub sort_dir: SortDir,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPage {
    pub items: Vec<Assignment>,
    pub next_cursor: Option<String>,
}

/// Lists a company's assignments a page at a time. The cursor is the offset
/// of the next page in the sorted result and is opaque to clients.
pub async fn list_assignments(
    state: &AppState,
    company_id: Uuid,
    query: AssignmentQuery,
) -> Result<AssignmentPage, AppError> {
    let limit = query.limit.unwrap_or(state.default_page_size);
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let offset = match query.cursor.as_deref() {
        None | Some("") => 0,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::Validation("cursor is invalid".to_string()))?,
    };

    let mut rows = state.assignments.list(company_id, &query.filter).await?;
    sort_assignments(&mut rows, query.sort_by, query.sort_dir);

    let total = rows.len();
    let items: Vec<Assignment> = rows.into_iter().skip(offset).take(limit).collect();
    let next_offset = offset + items.len();
    let next_cursor = (next_offset < total).then(|| next_offset.to_string());

    Ok(AssignmentPage { items, next_cursor })
}

fn sort_assignments(rows: &mut [Assignment], sort_by: SortBy, sort_dir: SortDir) {
    rows.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::StartDate => a.start_date.cmp(&b.start_date),
            // Open-ended rows sort after every closed one.
            SortBy::EndDate => match (a.end_date, b.end_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            },
            SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        }
        .then(a.id.cmp(&b.id));

        match sort_dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::{
        create_assignment, delete_assignment, list_assignments, update_assignment,
        AssignmentQuery, CreateAssignment, SortBy, SortDir,
    };
    use crate::engine::overlap::Subject;
    use crate::error::AppError;
    use crate::models::assignment::{AssignmentEventKind, AssignmentPatch};
    use crate::repository::memory::YieldingStore;
    use crate::repository::{AssignmentFilter, AssignmentRepository};
    use crate::state::AppState;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn command(
        driver: Uuid,
        vehicle: Uuid,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> CreateAssignment {
        CreateAssignment {
            driver_id: Some(driver),
            vehicle_id: Some(vehicle),
            start_date: Some(start),
            end_date: end,
        }
    }

    #[tokio::test]
    async fn missing_required_field_is_validation_error() {
        let state = AppState::new(16);
        let err = create_assignment(
            &state,
            Uuid::new_v4(),
            CreateAssignment {
                driver_id: Some(Uuid::new_v4()),
                vehicle_id: None,
                start_date: Some(date(2024, 1, 1)),
                end_date: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn end_before_start_is_rejected_without_write() {
        let state = AppState::new(16);
        let company = Uuid::new_v4();
        let err = create_assignment(
            &state,
            company,
            command(
                Uuid::new_v4(),
                Uuid::new_v4(),
                date(2024, 2, 1),
                Some(date(2024, 1, 31)),
            ),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidDateRange(_)));
        assert_eq!(state.assignments.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn driver_and_vehicle_are_checked_independently() {
        let state = AppState::new(16);
        let company = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let vehicle = Uuid::new_v4();

        let existing = create_assignment(
            &state,
            company,
            command(driver, vehicle, date(2024, 1, 1), Some(date(2024, 1, 31))),
        )
        .await
        .unwrap();

        let same_driver = create_assignment(
            &state,
            company,
            command(driver, Uuid::new_v4(), date(2024, 1, 15), None),
        )
        .await
        .unwrap_err();
        match same_driver {
            AppError::AssignmentOverlap(conflict) => {
                assert_eq!(conflict.subject, Subject::Driver);
                assert_eq!(conflict.assignment_id, existing.id);
            }
            other => panic!("expected overlap, got {other:?}"),
        }

        let same_vehicle = create_assignment(
            &state,
            company,
            command(Uuid::new_v4(), vehicle, date(2024, 1, 31), Some(date(2024, 1, 31))),
        )
        .await
        .unwrap_err();
        match same_vehicle {
            AppError::AssignmentOverlap(conflict) => {
                assert_eq!(conflict.subject, Subject::Vehicle);
                assert_eq!(conflict.assignment_id, existing.id);
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shrinking_clears_conflict_and_extending_creates_one() {
        let state = AppState::new(16);
        let company = Uuid::new_v4();
        let driver = Uuid::new_v4();

        let first = create_assignment(
            &state,
            company,
            command(driver, Uuid::new_v4(), date(2024, 1, 1), Some(date(2024, 1, 31))),
        )
        .await
        .unwrap();
        let second = create_assignment(
            &state,
            company,
            command(driver, Uuid::new_v4(), date(2024, 2, 10), Some(date(2024, 2, 20))),
        )
        .await
        .unwrap();

        let shrunk = update_assignment(
            &state,
            company,
            first.id,
            AssignmentPatch {
                end_date: Some(Some(date(2024, 1, 20))),
                ..AssignmentPatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(shrunk.end_date, Some(date(2024, 1, 20)));

        let err = update_assignment(
            &state,
            company,
            first.id,
            AssignmentPatch {
                end_date: Some(Some(date(2024, 2, 10))),
                ..AssignmentPatch::default()
            },
        )
        .await
        .unwrap_err();
        match err {
            AppError::AssignmentOverlap(conflict) => assert_eq!(conflict.assignment_id, second.id),
            other => panic!("expected overlap, got {other:?}"),
        }

        let stored = state.assignments.get(company, first.id).await.unwrap().unwrap();
        assert_eq!(stored.end_date, Some(date(2024, 1, 20)));
    }

    #[tokio::test]
    async fn update_ignores_own_row() {
        let state = AppState::new(16);
        let company = Uuid::new_v4();
        let created = create_assignment(
            &state,
            company,
            command(Uuid::new_v4(), Uuid::new_v4(), date(2024, 3, 1), Some(date(2024, 3, 1))),
        )
        .await
        .unwrap();

        let reopened = update_assignment(
            &state,
            company,
            created.id,
            AssignmentPatch {
                end_date: Some(None),
                ..AssignmentPatch::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(reopened.end_date, None);
    }

    #[tokio::test]
    async fn update_rejects_inverted_effective_interval() {
        let state = AppState::new(16);
        let company = Uuid::new_v4();
        let created = create_assignment(
            &state,
            company,
            command(Uuid::new_v4(), Uuid::new_v4(), date(2024, 3, 1), Some(date(2024, 3, 5))),
        )
        .await
        .unwrap();

        let err = update_assignment(
            &state,
            company,
            created.id,
            AssignmentPatch {
                start_date: Some(date(2024, 3, 6)),
                ..AssignmentPatch::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidDateRange(_)));
    }

    #[tokio::test]
    async fn other_company_cannot_touch_assignment() {
        let state = AppState::new(16);
        let owner = Uuid::new_v4();
        let created = create_assignment(
            &state,
            owner,
            command(Uuid::new_v4(), Uuid::new_v4(), date(2024, 3, 1), None),
        )
        .await
        .unwrap();

        let intruder = Uuid::new_v4();
        let update = update_assignment(&state, intruder, created.id, AssignmentPatch::default())
            .await
            .unwrap_err();
        let delete = delete_assignment(&state, intruder, created.id)
            .await
            .unwrap_err();

        assert!(matches!(update, AppError::NotFound(_)));
        assert!(matches!(delete, AppError::NotFound(_)));
        delete_assignment(&state, owner, created.id).await.unwrap();
        assert!(matches!(
            delete_assignment(&state, owner, created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_overlapping_creates_admit_exactly_one() {
        let state = Arc::new(
            AppState::new(16).with_assignment_repository(Arc::new(YieldingStore::default())),
        );
        let company = Uuid::new_v4();
        let driver = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                create_assignment(
                    &state,
                    company,
                    command(driver, Uuid::new_v4(), date(2024, 5, 1), Some(date(2024, 5, 31))),
                )
                .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        let rows = state
            .assignments
            .list(company, &AssignmentFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn commands_publish_events_for_their_company() {
        let state = AppState::new(16);
        let mut rx = state.assignment_events_tx.subscribe();
        let company = Uuid::new_v4();

        let created = create_assignment(
            &state,
            company,
            command(Uuid::new_v4(), Uuid::new_v4(), date(2024, 3, 1), None),
        )
        .await
        .unwrap();
        update_assignment(
            &state,
            company,
            created.id,
            AssignmentPatch {
                end_date: Some(Some(date(2024, 3, 10))),
                ..AssignmentPatch::default()
            },
        )
        .await
        .unwrap();
        delete_assignment(&state, company, created.id).await.unwrap();

        let mut kinds = Vec::new();
        for _ in 0..3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.company_id, company);
            assert_eq!(event.assignment.id, created.id);
            kinds.push(event.kind);
        }
        assert_eq!(
            kinds,
            vec![
                AssignmentEventKind::Created,
                AssignmentEventKind::Updated,
                AssignmentEventKind::Deleted,
            ]
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejected_commands_publish_nothing() {
        let state = AppState::new(16);
        let mut rx = state.assignment_events_tx.subscribe();

        let err = create_assignment(
            &state,
            Uuid::new_v4(),
            command(Uuid::new_v4(), Uuid::new_v4(), date(2024, 3, 2), Some(date(2024, 3, 1))),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidDateRange(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn listing_pages_through_sorted_rows() {
        let state = AppState::new(16);
        let company = Uuid::new_v4();
        for day in [5, 1, 3] {
            create_assignment(
                &state,
                company,
                command(Uuid::new_v4(), Uuid::new_v4(), date(2024, 4, day), None),
            )
            .await
            .unwrap();
        }

        let first = list_assignments(
            &state,
            company,
            AssignmentQuery {
                sort_by: SortBy::StartDate,
                sort_dir: SortDir::Desc,
                limit: Some(2),
                ..AssignmentQuery::default()
            },
        )
        .await
        .unwrap();
        let days: Vec<NaiveDate> = first.items.iter().map(|a| a.start_date).collect();
        assert_eq!(days, vec![date(2024, 4, 5), date(2024, 4, 3)]);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let second = list_assignments(
            &state,
            company,
            AssignmentQuery {
                sort_by: SortBy::StartDate,
                sort_dir: SortDir::Desc,
                limit: Some(2),
                cursor: first.next_cursor,
                ..AssignmentQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].start_date, date(2024, 4, 1));
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn listing_rejects_out_of_range_limit() {
        let state = AppState::new(16);
        let err = list_assignments(
            &state,
            Uuid::new_v4(),
            AssignmentQuery {
                limit: Some(0),
                ..AssignmentQuery::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }
}
