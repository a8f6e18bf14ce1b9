//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Protection numerics and coast-down physics."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use protlab_calc::{
    evaluate_transfer, predict, CoastDownIntegrator, ElectricalState, ScenarioParameters,
    SyncCheckLimits, TransferOutcome, TransferWindow,
};

const FRAME: f64 = 1.0 / 60.0;

fn run_coast_down(params: &ScenarioParameters, seconds: f64) -> Vec<(f64, ElectricalState)> {
    let integrator = CoastDownIntegrator::new(60.0);
    let mut state = ElectricalState::nominal(60.0);
    let mut t = 0.0;
    let mut trace = Vec::new();
    while t < seconds {
        t += FRAME;
        state = integrator.step(&state, FRAME, t, params);
        trace.push((t, state));
    }
    trace
}

#[test]
fn fast_window_is_open_early_and_closes_later() {
    let params = ScenarioParameters {
        inertia_constant: 0.5,
        decay_constant: 0.5,
        load_factor: 1.0,
    };
    let limits = SyncCheckLimits::default();
    let trace = run_coast_down(&params, 3.0);

    let (_, early) = trace[2];
    let verdict = evaluate_transfer(&early, &limits);
    assert_eq!(verdict.window, Some(TransferWindow::Fast));

    let first_unsafe = trace
        .iter()
        .position(|(_, state)| !evaluate_transfer(state, &limits).is_safe())
        .expect("a low inertia bus leaves the fast window");
    let first_residual = trace
        .iter()
        .position(|(_, state)| {
            evaluate_transfer(state, &limits).window == Some(TransferWindow::Residual)
        })
        .expect("residual voltage collapses within three seconds");
    assert!(first_unsafe < first_residual);
}

#[test]
fn ghost_prediction_leads_the_real_state() {
    let params = ScenarioParameters {
        inertia_constant: 0.5,
        decay_constant: 0.5,
        load_factor: 1.0,
    };
    let limits = SyncCheckLimits::default();
    let delay = 0.1;
    let trace = run_coast_down(&params, 3.0);

    let predicted_unsafe = trace
        .iter()
        .position(|(_, state)| !predict(state, 60.0, delay, &limits).is_sync_ready())
        .unwrap();
    let actual_unsafe = trace
        .iter()
        .position(|(_, state)| !evaluate_transfer(state, &limits).is_safe())
        .unwrap();
    assert!(predicted_unsafe <= actual_unsafe);
}

#[test]
fn high_inertia_bus_stays_close_for_the_first_200ms() {
    let params = ScenarioParameters::default();
    let trace = run_coast_down(&params, 0.2);
    let (t, last) = *trace.last().unwrap();
    assert!(t >= 0.2);
    assert!(last.voltage_pu < 1.0 && last.voltage_pu > 0.9);
    assert!(last.phase_angle_deg < 0.0);
    let verdict = evaluate_transfer(&last, &SyncCheckLimits::default());
    assert_eq!(verdict.outcome, TransferOutcome::Success);
}
