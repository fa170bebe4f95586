use super::*;
use msgfee_execution::{
    mocks::{bank_service, fee_tx_bytes, test_context, test_registry, with_fee_meter, MsgSend},
    ErrorKind,
};
use msgfee_types::TypedMsg;

const CONFIG: &str = r#"
chain_id: msgfee-local
port: 26657
worker_threads: 2
log_level: info
fees:
  default_fee_denom: stake
  floor_gas_price: 1stake
  usd_conversion_rate: 10
  msg_fees:
    - msg_type_url: /bank.v1.MsgSend
      additional_fee: 10stake
    - msg_type_url: /bank.v1.MsgBurn
      additional_fee: 2usd
"#;

fn config() -> Config {
    serde_yaml::from_str(CONFIG).expect("config parses")
}

#[test]
fn config_parses_and_validates() {
    let config = config().validate().expect("config is valid");
    assert_eq!(config.chain_id, "msgfee-local");
    assert_eq!(config.listen, "0.0.0.0:26657".parse().unwrap());
    assert_eq!(config.log_level, Level::INFO);
    assert!(!config.json_logs);
    assert_eq!(config.fee_params.floor_gas_price, Coin::new("stake", 1).unwrap());
    assert_eq!(config.msg_fees.len(), 2);
    assert_eq!(
        config.msg_fees[1].additional_fee,
        Coin::new("usd", 2).unwrap()
    );
}

#[test]
fn fees_default_when_omitted() {
    let config: Config = serde_yaml::from_str(
        "chain_id: c\nport: 1\nworker_threads: 1\nlog_level: debug\n",
    )
    .unwrap();
    let config = config.validate().unwrap();
    assert_eq!(config.fee_params, MsgFeesParams::default());
    assert!(config.msg_fees.is_empty());
}

#[test]
fn invalid_settings_are_rejected() {
    let mut bad = config();
    bad.worker_threads = 0;
    assert!(matches!(
        bad.validate(),
        Err(ConfigError::InvalidNonZero {
            field: "worker_threads",
            ..
        })
    ));

    let mut bad = config();
    bad.log_level = "loud".to_string();
    assert!(matches!(
        bad.validate(),
        Err(ConfigError::InvalidLogLevel { .. })
    ));

    let mut bad = config();
    bad.listen_address = "somewhere".to_string();
    assert!(matches!(
        bad.validate(),
        Err(ConfigError::InvalidAddress { .. })
    ));

    let mut bad = config();
    bad.chain_id = " ".to_string();
    assert!(matches!(bad.validate(), Err(ConfigError::Empty { .. })));
}

#[test]
fn fee_schedule_is_validated() {
    let mut bad = config();
    bad.fees.floor_gas_price = "1atom".to_string();
    assert!(matches!(
        bad.validate(),
        Err(ConfigError::FloorDenomMismatch { .. })
    ));

    let mut bad = config();
    bad.fees.msg_fees[1].msg_type_url = "/bank.v1.MsgSend".to_string();
    assert!(matches!(
        bad.validate(),
        Err(ConfigError::DuplicateMsgFee { .. })
    ));

    let mut bad = config();
    bad.fees.msg_fees[0].additional_fee = "ten".to_string();
    assert!(matches!(
        bad.validate(),
        Err(ConfigError::InvalidCoin { .. })
    ));

    let mut bad = config();
    bad.fees.msg_fees[0].msg_type_url = "bank.v1.MsgSend".to_string();
    assert!(matches!(
        bad.validate(),
        Err(ConfigError::InvalidTypeUrl { .. })
    ));

    let mut bad = config();
    bad.fees.usd_conversion_rate = 0;
    assert!(matches!(
        bad.validate(),
        Err(ConfigError::InvalidNonZero { .. })
    ));
}

#[test]
fn configured_router_charges_configured_fees() {
    let config = config().validate().unwrap();
    let router = config
        .build_router(test_registry(), vec![bank_service()])
        .unwrap();
    assert_eq!(router.routes().count(), 2);

    let send = MsgSend::new("alice", "bob", 1);
    let ctx = test_context(5, false, fee_tx_bytes("100stake", 5, &[&send]));
    router.dispatch(&ctx, &send).unwrap();
    with_fee_meter(&ctx, |meter| {
        assert_eq!(
            meter.fee_consumed_by_msg(MsgSend::TYPE_URL).to_string(),
            "10stake"
        );
    });

    let ctx = test_context(5, false, fee_tx_bytes("12stake", 5, &[&send]));
    assert_eq!(
        router.dispatch(&ctx, &send).unwrap_err().kind(),
        ErrorKind::InsufficientFee
    );
}

#[test]
fn duplicate_services_fail_router_construction() {
    let config = config().validate().unwrap();
    assert!(matches!(
        config.build_router(test_registry(), vec![bank_service(), bank_service()]),
        Err(RegistrationError::DuplicateRoute { .. })
    ));
}
