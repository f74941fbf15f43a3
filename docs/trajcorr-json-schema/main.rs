use std::path::PathBuf;

use schemars::schema::RootSchema;

use trajcorr::correlators::MeanSquareDisplacementParameters;
use trajcorr::correlators::NonGaussianParameterParameters;
use trajcorr::correlators::VelocityAutocorrelationParameters;
use trajcorr::correlators::StructureFactorParameters;
use trajcorr::correlators::IntermediateScatteringParameters;
use trajcorr::correlators::SelfIntermediateScatteringParameters;


macro_rules! generate_schema {
    ($name: expr, $Type: ty) => {
        save_schema($name, schemars::schema_for!($Type))
    };
}

fn save_schema(name: &str, schema: RootSchema) {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.push("build");
    path.push("json-schemas");
    std::fs::create_dir_all(&path).expect("failed to create JSON schema directory");

    path.push(format!("{}.json", name));

    let schema = serde_json::to_string_pretty(&schema).expect("failed to create JSON schema");
    std::fs::write(path, schema).expect("failed to save JSON schema to file");
}

fn main() {
    // one schema per name accepted by `Correlator::new`
    generate_schema!("msd", MeanSquareDisplacementParameters);
    generate_schema!("alpha2", NonGaussianParameterParameters);
    generate_schema!("vacf", VelocityAutocorrelationParameters);
    generate_schema!("sk", StructureFactorParameters);
    generate_schema!("fkt", IntermediateScatteringParameters);
    generate_schema!("fskt", SelfIntermediateScatteringParameters);
}
