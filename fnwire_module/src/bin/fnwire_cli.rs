// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use clap::Parser;

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = String::from("fnwire.toml"))]
    config_file: String,
    #[arg(short, long, default_value_t = String::from(""))]
    template: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Create a template configuration and exit.
    if !args.template.is_empty() {
        fnwire_api::util::create_template(&args.template, fnwire_module::fnwire_module_default_conf().as_str())?;
        return Ok(());
    }

    let conf = fnwire_module::read_conf_from_file(&args.config_file)?;
    if conf.client.id.is_empty() {
        anyhow::bail!("client.id must not be empty in {}", args.config_file);
    }
    log::info!("configuration {} is valid", args.config_file);

    println!("client: {}", conf.client);
    println!("mode: {}", conf.mode);
    match conf.mode {
        fnwire_module::DispatchMode::Serve => println!("path: {}", conf.path),
        fnwire_module::DispatchMode::Connect => println!("connect_options: {}", serde_json::to_string(&conf.connect_options)?),
    }
    Ok(())
}
