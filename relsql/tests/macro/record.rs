#[derive(relsql::Record, relsql::Table)]
#[table_name = "parts"]
#[key(PNO)]
#[key(PName, "Color")]
pub struct Part {
    #[attribute = "PNO"]
    pno: i64,
    #[attribute = "PName"]
    pname: String,
    #[attribute = "Color"]
    color: Option<String>,
    weight: f64,
    picture: Vec<u8>,
    in_stock: bool,
}

#[derive(relsql::Record)]
pub struct Dee {}

fn main() {
    use relsql::{Record, Table};

    assert_eq!(Part::name(), "parts");
    assert_eq!(Part::keys(), &[&["PNO"][..], &["PName", "Color"][..]][..]);
    assert_eq!(Part::heading().degree(), 6);
    assert_eq!(Dee::heading().degree(), 0);
}
