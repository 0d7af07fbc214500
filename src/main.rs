/*
 * main.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This file is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this file.  If not, see <http://www.gnu.org/licenses/>.
 */

use std::process::ExitCode;
use std::sync::Arc;

use postino::config::{Backend, Config};
use postino::router::{self, AppState};
use postino::server::Server;
use postino::store::memory::MemoryBackend;
use postino::store::sqlite::SqliteBackend;
use postino::store::StorageBackend;

fn init_logging(target: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if target == "-" {
        subscriber.with_writer(std::io::stderr).init();
    } else {
        subscriber.init();
        tracing::warn!(target = %target, "file log targets are not yet wired; logging to stderr");
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = Config::load(&config_path);
    init_logging(&config.log_target);

    tracing::info!(listen_address = %config.listen_address, port = config.port, backend = ?config.backend, "starting postino");

    let backend: Arc<dyn StorageBackend> = match config.backend {
        Backend::Memory => Arc::new(MemoryBackend::new()),
        Backend::Relational => Arc::new(SqliteBackend::open(&config.relational_path)?),
    };

    let state = Arc::new(AppState::new(backend, config.static_dir.clone(), config.template_dir.clone(), config.data_dir.clone()));
    let router_state = Arc::clone(&state);

    let mut server = Server::bind(&config, move |req| router::route(&router_state, req))?;
    tracing::info!(local_addr = ?server.local_addr()?, "listening");
    server.run(|| true)?;
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("postino: {e}");
            ExitCode::FAILURE
        }
    }
}
