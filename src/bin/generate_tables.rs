use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use pio_lookup_tables::translations::{
    ConceptMapTranslations, PreferredTerms, RefSetTranslations,
};
use pio_lookup_tables::{
    CacheConfig, DefinitionIndex, FileCache, GeneratorConfig, Result, SimplifierClient,
    StructureResolver, TerminologyClient, TerminologyResolver, TerminologyTable, pio_small,
    terminology,
};

#[derive(Parser, Debug)]
#[command(name = "generate-tables", version)]
#[command(about = "Generate the PIO editor lookup tables from the installed FHIR packages")]
struct Args {
    /// Directory containing the installed FHIR packages
    #[arg(long, default_value = "node_modules")]
    packages_dir: PathBuf,

    /// Directory with the KBV_SFHIR terminology files
    #[arg(long, default_value = "KBV_SFHIR")]
    sfhir_dir: PathBuf,

    /// PIO-Small exclusion document
    #[arg(long, default_value = "PioSmallExclusions.json")]
    exclusions: PathBuf,

    /// Where the generated JSON tables are written
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,

    /// Cache directory (defaults to ~/.pio-lookup-tables/cache)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Snowstorm terminology endpoint
    #[arg(long)]
    terminology_url: Option<Url>,

    /// Simplifier download endpoint
    #[arg(long)]
    simplifier_url: Option<Url>,

    /// Request ceiling for the terminology endpoint
    #[arg(long, default_value_t = 5)]
    requests_per_second: u32,
}

impl Args {
    fn into_config(self) -> GeneratorConfig {
        let defaults = GeneratorConfig::default();
        GeneratorConfig {
            packages_dir: self.packages_dir,
            sfhir_dir: self.sfhir_dir,
            exclusions_file: self.exclusions,
            output_dir: self.output_dir,
            cache: match self.cache_dir {
                Some(cache_dir) => CacheConfig::new(cache_dir, defaults.cache.expiry),
                None => defaults.cache,
            },
            terminology_base_url: self.terminology_url.unwrap_or(defaults.terminology_base_url),
            simplifier_base_url: self.simplifier_url.unwrap_or(defaults.simplifier_base_url),
            requests_per_second: self.requests_per_second,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    run(Args::parse().into_config()).await
}

async fn run(config: GeneratorConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let structure_resolver = StructureResolver::new(&config)?;
    let resource_table = structure_resolver.build_table().await?;
    write_json(&config.output_dir, "ResourceLookUpTable.json", &resource_table).await?;
    info!("Finished generating ResourceLookUpTable.json ({} resources)", resource_table.len());

    let exclusions = pio_small::load_exclusions(&config.exclusions_file).await?;
    let pio_small_table = pio_small::trim_table(&resource_table, &exclusions);
    write_json(&config.output_dir, "PioSmallLookUpTable.json", &pio_small_table).await?;
    info!("Finished generating PioSmallLookUpTable.json ({} resources)", pio_small_table.len());

    let cache = FileCache::new(&config.cache);
    let terminology_client = TerminologyClient::new(
        config.terminology_base_url.clone(),
        config.requests_per_second,
    )?;
    let simplifier_client = SimplifierClient::new(config.simplifier_base_url.clone())?;

    let index = DefinitionIndex::scan(&config.definition_dirs()).await?;
    let preferred = PreferredTerms::load(&terminology_client, &cache).await?;
    info!("Loaded {} German preferred terms", preferred.len());
    let terminology_resolver = TerminologyResolver::new(index, preferred);

    info!(
        "Resolving {} value-set references",
        terminology::collect_references(&pio_small_table).len()
    );
    let ((mut value_sets, stats), concept_maps, refsets) = tokio::join!(
        terminology_resolver.resolve_table(&pio_small_table),
        ConceptMapTranslations::load(&simplifier_client, &cache),
        RefSetTranslations::load(&terminology_client, &cache),
    );
    info!(
        "There should be {} German translations in {} enumerated codes",
        stats.german, stats.total
    );

    let from_concept_maps = concept_maps.apply(&mut value_sets);
    let from_refsets = refsets.apply(&mut value_sets);
    info!("Added {from_concept_maps} German terms from concept maps, {from_refsets} from reference sets");

    report_coverage(&value_sets);
    write_json(&config.output_dir, "ValueSetLookUpTable.json", &value_sets).await?;
    info!("Finished generating ValueSetLookUpTable.json ({} value sets)", value_sets.len());

    let translation_list = pio_small::translation_list(&exclusions);
    write_json(
        &config.output_dir,
        "TranslationListOfExcludedPaths.json",
        &translation_list,
    )
    .await?;
    info!("Finished generating TranslationListOfExcludedPaths.json");

    Ok(())
}

async fn write_json<T: Serialize>(output_dir: &Path, file_name: &str, value: &T) -> Result<()> {
    let serialized = serde_json::to_vec(value)?;
    tokio::fs::write(output_dir.join(file_name), serialized).await?;
    Ok(())
}

fn report_coverage(value_sets: &TerminologyTable) {
    let mut german = 0usize;
    let mut total = 0usize;
    for (url, concepts) in value_sets {
        let with_german = concepts
            .iter()
            .filter(|concept| concept.german_display.is_some())
            .count();
        debug!("{url}: {with_german}/{}", concepts.len());
        german += with_german;
        total += concepts.len();
    }
    if total > 0 {
        info!(
            "In total {:.2}% of the value-set table has German translations ({german}/{total})",
            german as f64 / total as f64 * 100.0
        );
    }
}
