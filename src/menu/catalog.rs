//! `AgriConnect` Tanzania menu catalogue

use super::{Completion, Field, Menu, MenuError, MenuId, MenuOption, MenuRegistry};
use crate::state_machine::PartyKind;

// Field names shared with the record-keeping collaborators
pub const FIELD_NAME: &str = "name";
pub const FIELD_LOCATION: &str = "location";
pub const FIELD_CROP_TYPE: &str = "crop_type";
pub const FIELD_BUSINESS_NAME: &str = "business_name";
pub const FIELD_BUSINESS_TYPE: &str = "business_type";
pub const FIELD_ORDER_TYPE: &str = "order_type";
pub const FIELD_CROP: &str = "crop";
pub const FIELD_QUANTITY: &str = "quantity";
pub const FIELD_PRICE: &str = "price";
/// Derived at order completion, never collected
pub const FIELD_TOTAL: &str = "total";
/// Always available to templates
pub const FIELD_PHONE: &str = "phone";

const MAIN: &str = "Karibu AgriConnect Tanzania\n\
1. Jisajili kama Mkulima\n\
2. Jisajili kama Mnunuzi\n\
3. Bei za Soko\n\
4. Oda za Biashara\n\
5. Akaunti Yangu\n\
6. Msaada\n\
0. Ondoka";

const FAREWELL: &str = "Asante kwa kutumia AgriConnect Tanzania!";

const MARKET_PRICES: &str = "Bei za Soko (TSh kwa Kilo)\n\
1. Mahindi - 1,200\n\
2. Mchele - 2,500\n\
3. Maharage - 3,800\n\
4. Nyanya - 1,800\n\
5. Vitunguu - 2,200\n\
6. Karanga - 4,500\n\
0. Rudi nyuma";

const ORDERS: &str = "Oda za Biashara\n\
1. Tengeneza oda mpya\n\
2. Angalia oda zangu\n\
3. Oda zinazopatikana\n\
4. Historia ya oda\n\
0. Rudi nyuma";

const ACCOUNT: &str = "Akaunti Yangu\n\
1. Salio la akaunti\n\
2. Historia ya miamala\n\
3. Taarifa za kibinafsi\n\
4. Badilisha nambari\n\
0. Rudi nyuma";

const HELP: &str = "Msaada na Usaidizi\n\
1. Maelekezo ya matumizi\n\
2. Bei za huduma\n\
3. Mawasiliano\n\
4. Maswali yanayoulizwa sana\n\
0. Rudi nyuma";

fn main_menu() -> Menu {
    Menu::choice(
        MenuId::Main,
        MAIN,
        vec![
            MenuOption::to("1", MenuId::RegisterFarmer),
            MenuOption::to("2", MenuId::RegisterBuyer),
            MenuOption::to("3", MenuId::MarketPrices),
            MenuOption::to("4", MenuId::Orders),
            MenuOption::to("5", MenuId::Account),
            MenuOption::to("6", MenuId::Help),
            MenuOption::end("0", FAREWELL),
        ],
    )
}

fn register_farmer() -> Menu {
    Menu::form(
        MenuId::RegisterFarmer,
        "Usajili wa Mkulima (0. Rudi nyuma)",
        vec![
            Field::text(FIELD_NAME, "Ingiza jina lako kamili:"),
            Field::text(FIELD_LOCATION, "Ingiza eneo lako (mfano: Arusha, Mwanza):"),
            Field::text(FIELD_CROP_TYPE, "Ingiza aina ya zao lako kuu:"),
        ],
        Completion::Register {
            kind: PartyKind::Farmer,
            confirmation: "Asante {name}! Umesajiliwa kama mkulima. \
                           Utapokea SMS za bei za soko na fursa za biashara.",
            welcome: "Karibu AgriConnect, {name}! Utapokea taarifa za hali ya hewa, \
                      bei za soko na ushauri wa kilimo.",
        },
    )
}

fn register_buyer() -> Menu {
    Menu::form(
        MenuId::RegisterBuyer,
        "Usajili wa Mnunuzi (0. Rudi nyuma)",
        vec![
            Field::text(FIELD_BUSINESS_NAME, "Ingiza jina la biashara yako:"),
            Field::text(FIELD_LOCATION, "Ingiza eneo la biashara (mji/wilaya):"),
            Field::text(FIELD_BUSINESS_TYPE, "Ingiza aina ya biashara (Jumla/Rejareja):"),
        ],
        Completion::Register {
            kind: PartyKind::Buyer,
            confirmation: "Asante! {business_name} imesajiliwa kama mnunuzi. \
                           Utapokea SMS za mazao yaliyopo.",
            welcome: "Karibu soko la AgriConnect, {business_name}! Tutakuunganisha na \
                      wakulima na mazao bora.",
        },
    )
}

fn market_prices() -> Menu {
    Menu::choice(
        MenuId::MarketPrices,
        MARKET_PRICES,
        vec![
            MenuOption::end(
                "1",
                "Mahindi: TSh 1,200/kg (+5% kutoka wiki iliyopita)\nSoko: Kariakoo, Dar es Salaam",
            ),
            MenuOption::end(
                "2",
                "Mchele: TSh 2,500/kg (bei imara)\nSoko: Tandale, Dar es Salaam",
            ),
            MenuOption::end(
                "3",
                "Maharage: TSh 3,800/kg (+8% kutoka wiki iliyopita)\nSoko: Mwenge, Dar es Salaam",
            ),
            MenuOption::end(
                "4",
                "Nyanya: TSh 1,800/kg (-2% kutoka wiki iliyopita)\nSoko: Buguruni, Dar es Salaam",
            ),
            MenuOption::end(
                "5",
                "Vitunguu: TSh 2,200/kg (+3% kutoka wiki iliyopita)\nSoko: Ilala, Dar es Salaam",
            ),
            MenuOption::end(
                "6",
                "Karanga: TSh 4,500/kg (+12% kutoka wiki iliyopita)\nSoko: Temeke, Dar es Salaam",
            ),
        ],
    )
}

fn orders() -> Menu {
    Menu::choice(
        MenuId::Orders,
        ORDERS,
        vec![
            MenuOption::to("1", MenuId::CreateOrder),
            MenuOption::end(
                "2",
                "Oda zako:\n1. Mahindi 50kg - Inasubiri\n2. Mchele 30kg - Imekamilika",
            ),
            MenuOption::end(
                "3",
                "Oda zinazopatikana:\n1. Nyanya 100kg - TSh 180,000\n2. Maharage 25kg - TSh 95,000",
            ),
            MenuOption::end(
                "4",
                "Historia ya oda zako:\nJumla ya miamala: 15\nKiasi cha jumla: TSh 2,450,000",
            ),
        ],
    )
}

fn create_order() -> Menu {
    Menu::form(
        MenuId::CreateOrder,
        "Tengeneza Oda Mpya (0. Rudi nyuma)",
        vec![
            Field::choice(
                FIELD_ORDER_TYPE,
                "1. Oda ya Kununua\n2. Oda ya Kuuza",
                vec![("1", "buy"), ("2", "sell")],
            ),
            Field::choice(
                FIELD_CROP,
                "Chagua aina ya zao:\n1. Mahindi\n2. Mchele\n3. Maharage\n4. Nyanya",
                vec![
                    ("1", "Mahindi"),
                    ("2", "Mchele"),
                    ("3", "Maharage"),
                    ("4", "Nyanya"),
                ],
            ),
            Field::number(FIELD_QUANTITY, "Ingiza kiasi (kwa kg):"),
            Field::number(FIELD_PRICE, "Ingiza bei unayotaka kwa kilo (TSh):"),
        ],
        Completion::PlaceOrder {
            confirmation: "Oda imesajiliwa!\nZao: {crop}\nKiasi: {quantity}kg\n\
                           Bei: TSh {price}/kg\nJumla: TSh {total}\n\n\
                           Utapokea SMS ya uthibitisho.",
            notice: "AgriConnect: Oda yako ya {crop} {quantity}kg kwa TSh {price}/kg \
                     (jumla TSh {total}) imepokelewa.",
        },
    )
}

fn account() -> Menu {
    Menu::choice(
        MenuId::Account,
        ACCOUNT,
        vec![
            MenuOption::end(
                "1",
                "Salio la Akaunti:\nSalio la sasa: TSh 275,000\nAkiba: TSh 150,000\nMikopo: TSh 0",
            ),
            MenuOption::end(
                "2",
                "Historia ya Miamala:\n1. Uuzaji wa mahindi +TSh 120,000\n\
                 2. Ununuzi wa mbegu -TSh 45,000\n3. Ada ya huduma -TSh 5,000",
            ),
            MenuOption::end("3", "Taarifa za Kibinafsi:\nSimu: {phone}"),
            MenuOption::end(
                "4",
                "Badilisha Nambari:\nTuma SMS kwa 15000 na ujumbe \"CHANGE [nambari mpya]\"",
            ),
        ],
    )
}

fn help() -> Menu {
    Menu::choice(
        MenuId::Help,
        HELP,
        vec![
            MenuOption::end(
                "1",
                "Maelekezo ya Matumizi:\n1. Piga *150*00#\n2. Chagua chaguo kutoka menyu\n\
                 3. Fuata maelekezo\n4. Maliza kwa kubonyeza 0",
            ),
            MenuOption::end(
                "2",
                "Bei za Huduma:\nUsajili: Bure\nOda: TSh 500\nMiamala: 2% ya kiasi\nSMS: TSh 50",
            ),
            MenuOption::end(
                "3",
                "Mawasiliano:\nSimu: +255 123 456 789\nSMS: 15000\n\
                 Barua pepe: msaada@agriconnect.co.tz",
            ),
            MenuOption::end(
                "4",
                "Maswali Yanayoulizwa Sana:\n1. Huduma ni bure? Usajili ni bure\n\
                 2. Nauzaje mazao? Tumia menyu ya oda\n3. Bei zinabadilika lini? Kila siku",
            ),
        ],
    )
}

/// Build the production menu registry
pub fn agriconnect() -> Result<MenuRegistry, MenuError> {
    MenuRegistry::new(
        MenuId::Main,
        [
            main_menu(),
            register_farmer(),
            register_buyer(),
            market_prices(),
            orders(),
            create_order(),
            account(),
            help(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuKind;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_registers_every_menu() {
        let registry = agriconnect().unwrap();
        for id in MenuId::ALL {
            assert!(registry.contains(id), "{id} missing from catalogue");
        }
        assert_eq!(registry.root_id(), MenuId::Main);
    }

    #[test]
    fn test_option_tokens_are_unique_per_menu() {
        let registry = agriconnect().unwrap();
        for id in registry.ids() {
            if let MenuKind::Choice(options) = &registry.lookup(id).unwrap().kind {
                let tokens: HashSet<_> = options.iter().map(|o| o.token).collect();
                assert_eq!(tokens.len(), options.len(), "duplicate token in {id}");
            }
        }
    }

    #[test]
    fn test_only_root_offers_exit() {
        let registry = agriconnect().unwrap();
        for id in registry.ids().filter(|id| *id != MenuId::Main) {
            if let MenuKind::Choice(options) = &registry.lookup(id).unwrap().kind {
                // "0" is reserved for back navigation outside the root
                assert!(options.iter().all(|o| o.token != "0"), "{id} shadows back");
            }
        }
    }

    #[test]
    fn test_every_menu_reachable_from_root() {
        let registry = agriconnect().unwrap();
        let mut seen = HashSet::from([MenuId::Main]);
        let mut frontier = vec![MenuId::Main];
        while let Some(id) = frontier.pop() {
            if let MenuKind::Choice(options) = &registry.lookup(id).unwrap().kind {
                for option in options {
                    if let crate::menu::Target::Menu(to) = option.target {
                        if seen.insert(to) {
                            frontier.push(to);
                        }
                    }
                }
            }
        }
        assert_eq!(seen.len(), MenuId::ALL.len());
    }
}
