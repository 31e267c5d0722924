//! Environment source: SPECFORGE__SECTION__KEY, e.g. SPECFORGE__SCHEDULER__MAX_CONCURRENCY=8

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("SPECFORGE")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("context.infrastructure_packages")
            .try_parsing(true),
    )
}
