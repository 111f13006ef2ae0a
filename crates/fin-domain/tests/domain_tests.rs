use fin_domain::{parse_date, Bar, OptionChain, OptionContract, OptionType};

#[test]
fn bars_serialize_with_iso_dates() {
    let bar = Bar::new(parse_date("2024-01-02").unwrap(), 10.0, 11.0, 9.5, 10.5, 1_000.0).unwrap();
    let json = serde_json::to_value(&bar).unwrap();
    assert_eq!(json["date"], "2024-01-02");
    assert_eq!(json["close"], 10.5);
}

#[test]
fn chain_roundtrips_through_json() {
    let chain = OptionChain { symbol: "AAPL".into(),
                              expiration: parse_date("2024-06-21").unwrap(),
                              underlying_price: 190.0,
                              calls: vec![OptionContract { strike: 190.0,
                                                           option_type: OptionType::Call,
                                                           bid: 4.0,
                                                           ask: 4.5,
                                                           last: Some(4.1),
                                                           volume: 1200.0,
                                                           open_interest: 5400.0,
                                                           implied_volatility: Some(0.24),
                                                           greeks: None }],
                              puts: vec![] };
    let json = serde_json::to_string(&chain).unwrap();
    let back: OptionChain = serde_json::from_str(&json).unwrap();
    assert_eq!(back, chain);
    assert_eq!(back.leg(OptionType::Call, 190.0).and_then(|c| c.mid_price()), Some(4.25));
}
