use crate::model::{AgencyRecord, CanonicalRecord, OrderRecord, RawRecord};

/// Map an extracted record onto its canonical shape.
///
/// Positional records are remapped column-by-column onto [`AgencyRecord`];
/// columns beyond the tenth are ignored and missing ones become empty.
/// Tagged records already are canonical.
pub fn canonicalize(raw: &RawRecord) -> CanonicalRecord {
    match raw {
        RawRecord::Positional(cells) => CanonicalRecord::Agency(agency_from_cells(cells)),
        RawRecord::Tagged(fields) => CanonicalRecord::Order(OrderRecord {
            fields: fields.clone(),
        }),
    }
}

fn agency_from_cells(cells: &[String]) -> AgencyRecord {
    let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
    AgencyRecord {
        agency_name: cell(0),
        address: cell(1),
        contact_name1: cell(2),
        phone1: cell(3),
        email1: cell(4),
        contact_name2: cell(5),
        phone2: cell(6),
        email2: cell(7),
        order_id: cell(8),
        date: cell(9),
    }
}
