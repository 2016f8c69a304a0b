//! # Binaire Importcsv
//!
//! Crée en masse les utilisateurs décrits dans un fichier CSV
//! (identifiant, prénom, nom, UO, groupe) avec un mot de passe initial
//! commun. Le fichier est validé en entier avant toute création :
//! la moindre erreur bloque l'import complet.

use std::collections::HashSet;
use std::io::Write;

use gestad::{batch, http_client::AdminClient, import};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: importcsv <fichier.csv> <mot_de_passe> [url_serveur]");
        std::process::exit(2);
    }
    let file = &args[1];
    let password = &args[2];
    let server_url = args.get(3).cloned();

    println!("[IMPORT] Lecture du fichier {}", file);
    let rows = import::load_csv(file)?;
    println!("[IMPORT] {} ligne(s) lue(s)", rows.len());

    // Récupération des référentiels depuis la passerelle
    let client = AdminClient::new(server_url);
    let known_ous: HashSet<String> = client.list_ous()?.into_iter().collect();
    let known_groups: HashSet<String> = client.list_groups()?.into_iter().collect();

    // Validation complète avant toute création : zéro erreur ou rien
    let mut errors = import::validate_rows(&rows, &known_ous, &known_groups);
    if !import::password_conforme(password) {
        errors.insert(0, import::MSG_PASSWORD.to_string());
    }
    if !errors.is_empty() {
        eprintln!("[IMPORT] Import bloqué, aucune ligne créée:");
        for error in import::cap_errors(errors) {
            eprintln!("[IMPORT]   - {}", error);
        }
        std::process::exit(1);
    }

    // Création séquentielle avec progression
    let users = import::rows_to_users(&rows);
    let report = batch::bulk_create(
        &client,
        &users,
        password,
        |p| {
            print!("\r[IMPORT] Progression: {:>3}%", p);
            let _ = std::io::stdout().flush();
        },
        None,
    )
    .map_err(|errors| errors.join("; "))?;
    println!();

    // Résumé final, que des items aient échoué ou non
    println!("[IMPORT] {}", report.summary());
    for failure in &report.errors {
        eprintln!("[IMPORT]   {} : {}", failure.identifier, failure.error_message);
    }

    if !report.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
