use ideaforge_config::Config;
use ideaforge_utils::exit_codes::ExitCode;

pub fn catalog(config: &Config, app_type: Option<&str>) -> Result<(), ExitCode> {
    let categories: Vec<_> = config
        .catalog
        .categories
        .iter()
        .filter(|c| app_type.is_none_or(|id| c.id == id))
        .collect();

    if categories.is_empty() {
        eprintln!("Error: unknown application type '{}'", app_type.unwrap_or_default());
        return Err(ExitCode::CLI_ARGS);
    }

    for category in categories {
        println!("{} ({})", category.name, category.id);
        println!("  {}", category.description);
        for stack in &category.tech_stacks {
            println!("  - {:<18} {}", stack.id, stack.name);
        }
        println!();
    }
    Ok(())
}
