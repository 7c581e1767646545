//! Quickstart: one federated round, a secure sum and a noised release

use ppml_core::{logging, ModelUpdate, PrivacyEngine, Settings};

fn main() {
    let settings = Settings::load(None).unwrap();
    logging::init(&settings.log).unwrap();

    println!("ppml-core Quickstart Demo\n");

    let initial = ModelUpdate::new()
        .with_vector("weights", vec![0.0, 0.0, 0.0])
        .with_vector("bias", vec![0.0]);
    let engine = PrivacyEngine::new(&settings, initial).unwrap();

    // Two hospitals train locally and submit only parameters
    let a = ModelUpdate::new()
        .with_vector("weights", vec![1.0, 2.0, 3.0])
        .with_vector("bias", vec![0.5]);
    let b = ModelUpdate::new()
        .with_vector("weights", vec![3.0, 4.0, 5.0])
        .with_vector("bias", vec![1.5]);

    let first = engine.train("hospital-a", a).unwrap();
    println!("hospital-a submitted: aggregated={}", first.aggregated);
    let second = engine.train("hospital-b", b).unwrap();
    println!(
        "hospital-b submitted: aggregated={} version={}",
        second.aggregated, second.current_version
    );

    let model = engine.get_model("hospital-a");
    println!("   weights: {}", model.get("weights").unwrap());
    println!("   bias:    {}", model.get("bias").unwrap());
    println!("   Expected: [2, 3, 4] and [1]\n");

    // Patient counts summed without any party seeing another's count
    let counts = [120.0, 85.0, 240.0];
    let total = engine.secure_sum(&counts).unwrap();
    let mean = engine.secure_mean(&counts).unwrap();
    println!("Secure sum of {:?}: {:.3}", counts, total);
    println!("Secure mean: {:.3}\n", mean);

    // Release the total under differential privacy
    let noisy = engine.add_noise(&[total], 0.5, 1.0, None).unwrap();
    let budget = engine.privacy_budget();
    println!("Noised total (epsilon=0.5): {:.3}", noisy[0]);
    println!(
        "Budget: used {:.2} of {:.2}, {:.2} remaining",
        budget.used, budget.total, budget.remaining
    );

    match engine.add_noise(&[total], 0.8, 1.0, None) {
        Ok(_) => println!("unexpected: release allowed past the budget"),
        Err(e) => println!("Second release refused: {}", e),
    }
}
