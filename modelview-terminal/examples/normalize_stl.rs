/// Example: print the framing transform for an STL file
///
/// Usage: cargo run --example normalize_stl -- path/to/file.stl [fit-size]

use std::env;
use std::error::Error;
use std::fs;

use modelview_core::{normalize_scene, stl, NormalizeConfig, SceneNode, SizeMetric};

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("Usage: {} <stl-file> [fit-size]", args[0]);
        return Ok(());
    };
    let target_fit_size = match args.get(2) {
        Some(size) => size.parse()?,
        None => NormalizeConfig::default().target_fit_size,
    };

    let mesh = stl::parse_stl(&fs::read(path)?)?;
    let mut scene = SceneNode::from_mesh(path.as_str(), mesh);
    println!("{}: {} triangles", path, scene.triangle_count());

    let before = scene.bounds();
    println!("bounds      {:?} .. {:?}", before.min, before.max);

    for metric in SizeMetric::ALL {
        let config = NormalizeConfig {
            target_fit_size,
            metric,
        };
        let transform = normalize_scene(&scene, &config)?;
        println!(
            "{:<11} translation {:?} scale {:.6}",
            metric.name(),
            transform.translation,
            transform.scale
        );
    }

    normalize_scene(&scene, &NormalizeConfig::default())?.apply_to(&mut scene);
    let after = scene.bounds();
    println!("framed      {:?} .. {:?}", after.min, after.max);
    Ok(())
}
