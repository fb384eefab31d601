pub fn score(utilization: f64) -> anyhow::Result<()> {
    match vmpack_placement::placement_score(utilization) {
        Some(value) => {
            println!("{value:.4}");
            Ok(())
        }
        None => anyhow::bail!("utilization {utilization} is outside the placement curve's domain"),
    }
}
