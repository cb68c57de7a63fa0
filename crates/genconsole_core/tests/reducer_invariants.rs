use genconsole_core::{
    progress_percentage, reduce, GenerationState, ParsedData, StepEvent, TotalStepsPolicy,
};

const NAMES: [&str; 4] = ["logo", "colors", "typography", "mockups"];

/// Small deterministic generator so every run walks the same sequences.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn random_event(rng: &mut Lcg) -> StepEvent {
    let name = NAMES[rng.pick(NAMES.len())];
    match rng.pick(3) {
        0 => StepEvent::started(name),
        1 => StepEvent::completed(name, format!("content of {name}")),
        _ => StepEvent::started(name).with_parsed_data(ParsedData {
            completed_steps: Some(vec![NAMES[rng.pick(NAMES.len())].to_string()]),
            steps_in_progress: Some(vec![NAMES[rng.pick(NAMES.len())].to_string()]),
            ..ParsedData::default()
        }),
    }
}

fn policies() -> [TotalStepsPolicy; 3] {
    [
        TotalStepsPolicy::Incremental,
        TotalStepsPolicy::Fixed(0),
        TotalStepsPolicy::Fixed(3),
    ]
}

#[test]
fn completed_count_never_decreases_and_sets_stay_disjoint() {
    for policy in policies() {
        for seed in 0..200 {
            let mut rng = Lcg(seed);
            let mut state = GenerationState::generating(policy);
            let mut previous_completed = 0;
            for _ in 0..40 {
                state = reduce(state, &random_event(&mut rng), policy);

                assert!(state.completed_steps.len() >= previous_completed);
                previous_completed = state.completed_steps.len();

                for name in &state.steps_in_progress {
                    assert!(!state.completed_steps.contains(name), "seed {seed}: {name}");
                }
                for name in &state.completed_steps {
                    assert!(state.step(name).is_some(), "seed {seed}: unseen {name}");
                }
                let percent = progress_percentage(&state);
                assert!(percent <= 100);
            }
        }
    }
}

#[test]
fn completing_twice_equals_completing_once() {
    for policy in policies() {
        for seed in 0..100 {
            let mut rng = Lcg(seed);
            let mut state = GenerationState::generating(policy);
            for _ in 0..10 {
                state = reduce(state, &random_event(&mut rng), policy);
            }
            let completion = StepEvent::completed("logo", "<svg/>");
            let once = reduce(state, &completion, policy);
            let twice = reduce(once.clone(), &completion, policy);
            assert_eq!(once, twice, "seed {seed}");
        }
    }
}

#[test]
fn percentage_bounded_when_total_is_unset_or_exceeded() {
    let state = GenerationState {
        completed_steps: vec!["a".into(), "b".into(), "c".into()],
        total_steps: 1,
        ..GenerationState::default()
    };
    assert_eq!(progress_percentage(&state), 100);

    let unset = GenerationState::default();
    assert_eq!(progress_percentage(&unset), 0);
}
