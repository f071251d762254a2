#[cfg(test)]
pub mod test {
    use crate::spec::Specification;

    /// A spec exercising every validation phase.
    pub const EXAMPLE_SPEC: &str = r#"
example:
  description: Example deployment
  groups:
    - title: Group A
      options:
        req-arg-a:
          type: str
          help: First trigger
        req-arg-b:
          type: str
          help: Second trigger
    - title: Group B
      options:
        uni-dep:
          type: str
          required_when: "req-arg-a == yes"
        multi-dep:
          type: str
          required_when:
            - "req-arg-b == always-multi"
            - "uni-dep == multi-trigger"
        uni-neg-dep:
          type: str
          required_when: "uni-dep != uni-val"
    - title: Group E
      options:
        version:
          type: int
        uni-int:
          type: str
          required_when: "version == 11"
    - title: Group F
      options:
        value-minmax:
          type: int
          minimum: 100
          maximum: 200
    - title: Defaults
      options:
        mode:
          type: str
          default: fast
        tuning:
          type: str
          required_when: "mode != fast"
        dry-run:
          type: flag
        db.host:
          type: str
          default: localhost
        db.port:
          type: int
          default: 5432
        verbose:
          type: bool
"#;

    /// Two options: `req-arg-b` is required once `req-arg-a` is `yes`.
    pub const PAIR_SPEC: &str = r#"
pair:
  groups:
    - title: Pair
      options:
        req-arg-a:
          type: str
        req-arg-b:
          type: str
          required_when: "req-arg-a == yes"
"#;

    pub fn example_spec() -> Specification {
        Specification::from_yaml_str(EXAMPLE_SPEC).unwrap()
    }

    pub fn pair_spec() -> Specification {
        Specification::from_yaml_str(PAIR_SPEC).unwrap()
    }

    #[test]
    fn fixtures_parse() {
        assert!(example_spec().parser("example").is_ok());
        assert!(pair_spec().parser("pair").is_ok());
    }
}
