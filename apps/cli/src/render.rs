//! Plain-text rendering of the customer list for the terminal.

use client_core::PageSnapshot;
use shared::domain::Customer;

const HEADERS: [&str; 9] = [
    "ID",
    "First Name",
    "Last Name",
    "Street",
    "Address",
    "City",
    "State",
    "Email",
    "Phone",
];

fn columns(customer: &Customer) -> [&str; 9] {
    let d = &customer.details;
    [
        customer.uuid.as_str(),
        &d.first_name,
        &d.last_name,
        &d.street,
        &d.address,
        &d.city,
        &d.state,
        &d.email,
        &d.phone,
    ]
}

pub fn format_page(snapshot: &PageSnapshot) -> String {
    let mut out = String::new();

    if let Some((field, term)) = snapshot.query.filter() {
        out.push_str(&format!("filter: {field} = \"{term}\"\n"));
    }

    if snapshot.rows.is_empty() {
        out.push_str("No customers found.\n");
    } else {
        let mut widths = HEADERS.map(|h| h.chars().count());
        for row in &snapshot.rows {
            for (width, cell) in widths.iter_mut().zip(columns(row)) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |cells: [&str; 9]| {
            cells
                .iter()
                .zip(widths.iter())
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        out.push_str(&line(HEADERS));
        out.push('\n');
        for row in &snapshot.rows {
            out.push_str(&line(columns(row)));
            out.push('\n');
        }
    }

    let page = u64::from(snapshot.page_index) + 1;
    out.push_str(&format!(
        "page {page} of {} ({} customers)",
        snapshot.total_pages.max(1),
        snapshot.total_elements
    ));
    if snapshot.has_previous() {
        out.push_str(&format!("  prev: --page {}", page - 1));
    }
    if snapshot.has_next() {
        out.push_str(&format!("  next: --page {}", page + 1));
    }
    out.push('\n');
    out
}

pub fn print_page(snapshot: &PageSnapshot) {
    print!("{}", format_page(snapshot));
}

pub fn print_customer(customer: &Customer) {
    for (header, value) in HEADERS.iter().zip(columns(customer)) {
        println!("{header:>10}: {value}");
    }
}
