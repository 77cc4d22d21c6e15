use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use common::report::{CONTAINER, ECS_SERVICE, ECS_TASK};
use common::{ContainerObservation, Node, Report, TagStatus, TagSummary, Topology};
use reqwest::{Client, StatusCode, Url};
use std::collections::BTreeMap;
use std::env;

/// - En Docker: PROBE_URL=http://probe:4041
/// - Local: default http://localhost:4041
fn probe_base_url() -> String {
    env::var("PROBE_URL").unwrap_or_else(|_| "http://localhost:4041".to_string())
}

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI simple para hablar con el probe")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resumen del reporte: cuántos nodos hay en cada topología
    Report,
    /// Lista los contenedores con sus padres
    Containers,
    /// Lista las tasks ECS
    Tasks,
    /// Lista los servicios ECS
    Services,
    /// Reporta un contenedor al probe
    Observe {
        #[arg(value_name = "CONTAINER_ID")]
        id: String,

        /// Label de docker, se puede repetir: --label clave=valor
        #[arg(long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },
    /// Saca un contenedor del reporte
    Forget {
        #[arg(value_name = "CONTAINER_ID")]
        id: String,
    },
    /// Corre una pasada de tagging ahora
    Tag,
    /// Estado de la última pasada de tagging
    Status,
}

/// Arma `{base_url}/api/v1/...` con cada segmento escapado.
fn api_url(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url =
        Url::parse(base_url).with_context(|| format!("PROBE_URL inválida: {}", base_url))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("PROBE_URL no puede llevar path: {}", base_url))?
        .pop_if_empty()
        .extend(["api", "v1"])
        .extend(segments);
    Ok(url)
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("label inválido '{}', se espera clave=valor", s)),
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = probe_base_url();

    match cli.command {
        Commands::Report => {
            let url = api_url(&base_url, &["report"])?;
            let report: Report = client.get(url).send().await?.error_for_status()?.json().await?;

            println!("Reporte:");
            for name in [CONTAINER, ECS_TASK, ECS_SERVICE] {
                if let Some(topo) = report.topology(name) {
                    println!("  {:<12}: {} {}", name, topo.len(), topo.label_plural);
                }
            }
        }

        Commands::Containers => {
            let topo = get_topology(&client, &base_url, CONTAINER).await?;
            if topo.is_empty() {
                println!("No hay contenedores.");
            }
            for node in topo.nodes.values() {
                println!("Contenedor {}", node.id);
                for relation in node.parents.keys() {
                    if let Some(ids) = node.parents.lookup(relation) {
                        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                        println!("  {:<12}: {}", relation, ids.join(", "));
                    }
                }
            }
        }

        Commands::Tasks => {
            let topo = get_topology(&client, &base_url, ECS_TASK).await?;
            print_topology(&topo);
        }

        Commands::Services => {
            let topo = get_topology(&client, &base_url, ECS_SERVICE).await?;
            print_topology(&topo);
        }

        Commands::Observe { id, labels } => {
            let url = api_url(&base_url, &["containers"])?;
            let obs = ContainerObservation {
                id,
                labels: labels.into_iter().collect::<BTreeMap<_, _>>(),
            };
            let node: Node = client
                .post(url)
                .json(&obs)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            println!("Contenedor {} registrado ({} atributos)", node.id, node.latest.len());
        }

        Commands::Forget { id } => {
            let url = api_url(&base_url, &["containers", id.as_str()])?;
            let resp = client.delete(url).send().await?;
            let status = resp.status();
            if status == StatusCode::NO_CONTENT {
                println!("Contenedor {} eliminado", id);
            } else if status == StatusCode::NOT_FOUND {
                println!("No se encontró el contenedor {}", id);
            } else {
                bail!("el probe respondió {}", status);
            }
        }

        Commands::Tag => {
            let url = api_url(&base_url, &["tag"])?;
            let resp = client.post(url).send().await?;

            if resp.status().is_success() {
                let summary: TagSummary = resp.json().await?;
                print_summary(&summary);
            } else if resp.status() == StatusCode::BAD_GATEWAY {
                let status: TagStatus = resp.json().await?;
                println!(
                    "Pasada abortada: {}",
                    status.last_error.as_deref().unwrap_or("(sin detalle)")
                );
            } else {
                bail!("el probe respondió {}", resp.status());
            }
        }

        Commands::Status => {
            let url = api_url(&base_url, &["tag", "status"])?;
            let status: TagStatus = client.get(url).send().await?.error_for_status()?.json().await?;

            match status.finished_at {
                Some(at) => println!("Última pasada: {}", at),
                None => println!("Todavía no corrió ninguna pasada"),
            }
            if let Some(summary) = &status.last_summary {
                print_summary(summary);
            }
            if let Some(err) = &status.last_error {
                println!("  último error: {}", err);
            }
        }
    }

    Ok(())
}

async fn get_topology(client: &Client, base_url: &str, name: &str) -> Result<Topology> {
    let url = api_url(base_url, &["topologies", name])?;
    let topo = client.get(url).send().await?.error_for_status()?.json().await?;
    Ok(topo)
}

/// Imprime cada nodo con los campos de sus templates, por prioridad.
fn print_topology(topo: &Topology) {
    if topo.is_empty() {
        println!("No hay {}.", topo.label_plural);
        return;
    }

    let mut templates = topo.metadata_templates.clone();
    templates.sort_by_key(|t| t.priority);

    for node in topo.nodes.values() {
        println!("{} {}", topo.label, node.id);
        for t in &templates {
            if let Some(value) = node.lookup(&t.id) {
                println!("  {:<14}: {}", t.label, value);
            }
        }
    }
}

fn print_summary(summary: &TagSummary) {
    println!("Pasada {}:", summary.pass_id);
    println!("  clusters     : {}", summary.clusters);
    println!("  servicios    : {}", summary.services);
    println!(
        "  tasks        : {} (saltadas {})",
        summary.tasks, summary.tasks_skipped
    );
    println!(
        "  contenedores : {} (desaparecidos {})",
        summary.containers_tagged, summary.containers_missing
    );
}
