/// Policy used when no policy file is configured.
pub const DEFAULT_POLICY: &str = r#"
policy_version: "builtin-1"
rules:
  - name: block_unhosted_wallets
    description: Block transfers where the originator wallet has no KYC.
    when:
      field: originator.kyc
      op: eq
      value: false
    action: block
    priority: 20

  - name: flag_high_value_eur
    description: Flag high-value EUR transfers above the configured threshold.
    when:
      all:
        - field: amount
          op: gt
          value: 100000
        - field: currency
          op: eq
          value: "EUR"
    action: flag
    priority: 10

  - name: flag_virtual_asset_transfer
    description: Flag virtual asset transfers for extra review.
    when:
      field: context
      op: eq
      value: "Virtual_Asset_Transfer"
    action: flag
    priority: 8

  - name: default_allow
    description: Allow everything not caught by stricter rules.
    when: {}
    action: allow
    priority: 0
"#;
