//! End-to-end runs of reservoir cases through the report-step driver.

use std::cell::RefCell;
use std::rc::Rc;

use rf_model::{
    AQUIFER_INFLUX_KEY, Case, CaseDef, Grid, ModelError, ReservoirState, cumulative_key,
};
use rf_schedule::ScheduleEvent;
use rf_sim::{
    NEXT_STEP_KEY, NullOutput, OutputSink, RestartPayload, RestartSource, RestartValues,
    SimError, SimResult, Snapshot,
};

const DEPLETION: &str = include_str!("../../../cases/depletion.yaml");

#[derive(Debug, Clone)]
struct Saved {
    report_step: usize,
    state: ReservoirState,
    next_step: Option<f64>,
    sub_models: RestartValues,
}

struct Capture {
    saved: Rc<RefCell<Vec<Saved>>>,
}

impl OutputSink<ReservoirState> for Capture {
    fn write_snapshot(&mut self, snapshot: &Snapshot<'_, ReservoirState>) -> SimResult<()> {
        self.saved.borrow_mut().push(Saved {
            report_step: snapshot.report_step,
            state: snapshot.state.clone(),
            next_step: snapshot.next_step,
            sub_models: snapshot.sub_models.clone(),
        });
        Ok(())
    }
}

impl RestartSource<ReservoirState> for Saved {
    fn load_restart(
        &mut self,
        requested_extra: &[&str],
    ) -> SimResult<RestartPayload<ReservoirState>> {
        let mut extra: RestartValues = self
            .sub_models
            .iter()
            .filter(|(key, _)| requested_extra.contains(&key.as_str()))
            .map(|(key, values)| (key.clone(), values.clone()))
            .collect();
        if let Some(step) = self.next_step {
            extra.insert(NEXT_STEP_KEY.to_string(), vec![step]);
        }
        Ok(RestartPayload {
            report_step: self.report_step,
            state: Some(self.state.clone()),
            extra,
        })
    }
}

#[test]
fn shipped_case_loads_with_well_events() {
    let case = Case::from_yaml_str(DEPLETION).expect("case should load");
    assert_eq!(case.name(), "depletion");
    assert_eq!(case.schedule().num_steps(), 4);

    let schedule = case.schedule();
    assert!(schedule.has_event(ScheduleEvent::NewWell, 0));
    assert!(schedule.has_event(ScheduleEvent::ProductionUpdate, 2));
    assert!(schedule.has_event(ScheduleEvent::WellStatusChange, 3));
    assert!(schedule.has_event(ScheduleEvent::TuningChange, 3));
    assert!(schedule.events_at(1).is_empty());

    let state = case.initial_state();
    assert_eq!(state.num_cells(), 10);
    assert_eq!(state.aquifer_pressure, Some(2.5e7));
}

#[test]
fn depletion_run_cuts_steps_and_balances_mass() {
    let def: CaseDef = serde_yaml::from_str(DEPLETION).unwrap();
    let grid = Grid::from_def(&def.grid).unwrap();
    let case = Case::from_def(def).unwrap();
    let (mut driver, schedule, initial) = case.into_driver(true, Box::new(NullOutput)).unwrap();

    let outcome = driver.run(&schedule, initial.clone()).expect("run should succeed");
    let report = &outcome.report;

    assert!(report.converged);
    assert!((report.simulated_time - schedule.total_time()).abs() < 1e-6);
    assert!(report.step_cuts > 0, "rate increase should force a cut");
    assert!(outcome.failures.sub_steps > 0);
    assert!(report.sub_steps > schedule.num_steps());

    let produced = driver.wells().cumulative("PROD1").unwrap();
    assert!((produced - 7000.0).abs() < 1e-6);

    let influx = driver.aquifer().cumulative_influx();
    assert!(influx > 0.0);

    let depleted =
        grid.fluid_in_place(&initial.pressure) - grid.fluid_in_place(&outcome.state.pressure);
    assert!(
        (depleted + influx - produced).abs() < 0.1,
        "mass balance: depleted {depleted}, influx {influx}, produced {produced}"
    );
    assert!(outcome.state.aquifer_pressure.unwrap() < 2.5e7);
}

#[test]
fn tuning_limits_steps_after_shut_in() {
    let case = Case::from_yaml_str(DEPLETION).unwrap();
    let (mut driver, schedule, initial) = case.into_driver(false, Box::new(NullOutput)).unwrap();
    let outcome = driver.run(&schedule, initial).unwrap();
    assert_eq!(outcome.suggested_next_step, Some(5.0 * 86_400.0));
}

#[test]
fn unreachable_tolerance_fails_at_minimum_step() {
    let mut def: CaseDef = serde_yaml::from_str(DEPLETION).unwrap();
    def.config.timestep.min_step_days = 1.0;
    def.solver.max_pressure_change_bar = 1.0e-6;
    let case = Case::from_def(def).unwrap();
    let (mut driver, schedule, initial) = case.into_driver(false, Box::new(NullOutput)).unwrap();

    match driver.run(&schedule, initial) {
        Err(SimError::IntervalFailed { report_step, .. }) => assert_eq!(report_step, 0),
        other => panic!("expected interval failure, got {other:?}"),
    }
}

#[test]
fn control_beyond_schedule_is_rejected() {
    let mut def: CaseDef = serde_yaml::from_str(DEPLETION).unwrap();
    def.wells[0].controls[2].step = 9;
    assert!(matches!(Case::from_def(def), Err(ModelError::Schedule(_))));
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = DEPLETION.replace("solver:", "solvr:");
    assert!(matches!(Case::from_yaml_str(&yaml), Err(ModelError::Yaml(_))));
}

#[test]
fn resumed_run_continues_well_and_aquifer_totals() {
    let saved = Rc::new(RefCell::new(Vec::new()));
    let case = Case::from_yaml_str(DEPLETION).unwrap();
    let sink = Capture {
        saved: Rc::clone(&saved),
    };
    let (mut full, schedule, initial) = case.into_driver(false, Box::new(sink)).unwrap();
    full.run(&schedule, initial).unwrap();
    let full_influx = full.aquifer().cumulative_influx();

    let checkpoint = saved
        .borrow()
        .iter()
        .find(|s| s.report_step == 2)
        .cloned()
        .expect("snapshot after report step 2");
    let saved_total = checkpoint.sub_models[&cumulative_key("PROD1")][0];
    assert!((saved_total - 2000.0).abs() < 1e-6);
    assert!(checkpoint.sub_models[AQUIFER_INFLUX_KEY][0] > 0.0);

    let case = Case::from_yaml_str(DEPLETION).unwrap();
    let (resumed, schedule, initial) = case.into_driver(false, Box::new(NullOutput)).unwrap();
    let mut resumed = resumed.with_restart(Box::new(checkpoint));
    let outcome = resumed.run(&schedule, initial).unwrap();

    assert!(outcome.report.converged);
    let produced = resumed.wells().cumulative("PROD1").unwrap();
    assert!((produced - 7000.0).abs() < 1e-6, "produced {produced}");
    let influx = resumed.aquifer().cumulative_influx();
    assert!(
        (influx - full_influx).abs() <= 1e-9 * full_influx,
        "influx {influx} vs {full_influx}"
    );
}

fn resume_from(state: ReservoirState) -> SimResult<rf_sim::RunOutcome<ReservoirState>> {
    let case = Case::from_yaml_str(DEPLETION).unwrap();
    let (driver, schedule, initial) = case.into_driver(false, Box::new(NullOutput)).unwrap();
    let mut driver = driver.with_restart(Box::new(Saved {
        report_step: 1,
        state,
        next_step: Some(86_400.0),
        sub_models: RestartValues::new(),
    }));
    driver.run(&schedule, initial)
}

#[test]
fn restored_state_from_another_grid_is_rejected() {
    let mut state = ReservoirState::uniform(4, 2.5e7);
    state.aquifer_pressure = Some(2.5e7);
    match resume_from(state) {
        Err(SimError::Restart { message }) => assert!(message.contains("4 cells")),
        other => panic!("expected restart error, got {other:?}"),
    }
}

#[test]
fn restored_state_without_aquifer_pressure_is_rejected() {
    let state = ReservoirState::uniform(10, 2.5e7);
    assert!(matches!(resume_from(state), Err(SimError::Restart { .. })));
}
