use std::env;
use std::path::PathBuf;

use datagen_definition::read_model_definition;
use datagen_generate::Model;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut model_path: Option<PathBuf> = None;
    let mut rows = 5_usize;
    let mut threads = 2_usize;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rows" => rows = args.next().ok_or("missing --rows value")?.parse()?,
            "--threads" => threads = args.next().ok_or("missing --threads value")?.parse()?,
            _ => {
                if model_path.is_none() {
                    model_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let model_path = model_path.unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../models/examples/customers.model.json")
    });
    let definition = read_model_definition(&model_path)?;
    let model = Model::build(&definition)?;

    println!("{}", model.csv_header());
    for row in model.generate_random_rows(rows, threads)? {
        println!("{}", row.to_csv());
    }
    Ok(())
}
