//! CLI handlers for `tally customer` subcommands.

use anyhow::Result;
use sqlx::PgPool;

use tally_db::models::Customer;
use tally_db::queries::customers::{self, NewCustomer};

use crate::CustomerCommands;

pub async fn run_customer_command(command: CustomerCommands, pool: &PgPool) -> Result<()> {
    match command {
        CustomerCommands::Add {
            name,
            email,
            company,
            phone,
        } => {
            let new = NewCustomer {
                name,
                email,
                company,
                phone,
            };
            let customer = cmd_add(pool, &new).await?;
            println!("Customer created: {}", customer.id);
            Ok(())
        }
        CustomerCommands::List => {
            let all = customers::list_customers(pool).await?;
            if all.is_empty() {
                println!("No customers found. Use `tally customer add` to create one.");
            } else {
                print!("{}", render_table(&all));
            }
            Ok(())
        }
    }
}

async fn cmd_add(pool: &PgPool, new: &NewCustomer) -> Result<Customer> {
    if new.name.trim().is_empty() {
        anyhow::bail!("customer name must not be empty");
    }
    let customer = customers::insert_customer(pool, new).await?;
    tracing::info!(customer_id = %customer.id, "customer created");
    Ok(customer)
}

fn render_table(rows: &[Customer]) -> String {
    let name_w = rows.iter().map(|c| c.name.len()).max().unwrap_or(4).max(4);
    let email_w = rows.iter().map(|c| c.email.len()).max().unwrap_or(5).max(5);

    let mut out = format!("{:<36}  {:<name_w$}  {:<email_w$}  COMPANY\n", "ID", "NAME", "EMAIL");
    for c in rows {
        out.push_str(&format!(
            "{:<36}  {:<name_w$}  {:<email_w$}  {}\n",
            c.id, c.name, c.email, c.company,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use tally_test_utils::{create_test_db, drop_test_db};

    use super::*;

    fn customer(name: &str, email: &str) -> Customer {
        Customer {
            id: Uuid::nil(),
            name: name.into(),
            email: email.into(),
            company: "Very Good Building".into(),
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn table_columns_align_to_widest_value() {
        let table = render_table(&[
            customer("Leslie Knope", "leslie@pawnee.test"),
            customer("Ann", "ann@pawnee.test"),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        let email_col = lines[0].find("EMAIL").unwrap();
        assert_eq!(lines[1].find("leslie@").unwrap(), email_col);
        assert_eq!(lines[2].find("ann@").unwrap(), email_col);
    }

    #[tokio::test]
    async fn add_rejects_blank_name_and_inserts_valid() {
        let (pool, db_name) = create_test_db().await;

        let blank = NewCustomer {
            name: "  ".into(),
            email: "blank@pawnee.test".into(),
            company: String::new(),
            phone: None,
        };
        assert!(cmd_add(&pool, &blank).await.is_err());

        let ok = NewCustomer {
            name: "Tom Haverford".into(),
            ..blank
        };
        let created = cmd_add(&pool, &ok).await.unwrap();
        let listed = customers::list_customers(&pool).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
