// ABI descriptors for the contracts this service talks to.

use ethers::contract::abigen;

abigen!(
    StateView,
    r#"[
      {
        "type": "function",
        "name": "getSlot0",
        "stateMutability": "view",
        "inputs": [{"name": "poolId", "type": "bytes32"}],
        "outputs": [
          {"name": "sqrtPriceX96", "type": "uint160"},
          {"name": "tick", "type": "int24"},
          {"name": "protocolFee", "type": "uint24"},
          {"name": "lpFee", "type": "uint24"}
        ]
      },
      {
        "type": "function",
        "name": "getLiquidity",
        "stateMutability": "view",
        "inputs": [{"name": "poolId", "type": "bytes32"}],
        "outputs": [{"name": "liquidity", "type": "uint128"}]
      },
      {
        "type": "function",
        "name": "getPositionInfo",
        "stateMutability": "view",
        "inputs": [
          {"name": "poolId", "type": "bytes32"},
          {"name": "owner", "type": "address"},
          {"name": "tickLower", "type": "int24"},
          {"name": "tickUpper", "type": "int24"},
          {"name": "salt", "type": "bytes32"}
        ],
        "outputs": [
          {"name": "liquidity", "type": "uint128"},
          {"name": "feeGrowthInside0LastX128", "type": "uint256"},
          {"name": "feeGrowthInside1LastX128", "type": "uint256"}
        ]
      },
      {
        "type": "function",
        "name": "poolManager",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [{"name": "", "type": "address"}]
      }
    ]"#
);

// Tuple arguments are left without internalType so the bindings take plain
// tuples: key = (currency0, currency1, fee, tickSpacing, hooks),
// params = (tickLower, tickUpper, liquidityDelta, salt).
abigen!(
    PoolModifyLiquidityTest,
    r#"[
      {
        "type": "function",
        "name": "modifyLiquidity",
        "stateMutability": "payable",
        "inputs": [
          {
            "name": "key",
            "type": "tuple",
            "components": [
              {"name": "currency0", "type": "address"},
              {"name": "currency1", "type": "address"},
              {"name": "fee", "type": "uint24"},
              {"name": "tickSpacing", "type": "int24"},
              {"name": "hooks", "type": "address"}
            ]
          },
          {
            "name": "params",
            "type": "tuple",
            "components": [
              {"name": "tickLower", "type": "int24"},
              {"name": "tickUpper", "type": "int24"},
              {"name": "liquidityDelta", "type": "int256"},
              {"name": "salt", "type": "bytes32"}
            ]
          },
          {"name": "hookData", "type": "bytes"}
        ],
        "outputs": [{"name": "delta", "type": "int256"}]
      }
    ]"#
);

abigen!(
    KalaMoney,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
        function allowance(address owner, address spender) external view returns (uint256)
        function balanceOf(address account) external view returns (uint256)
        function decimals() external view returns (uint8)
        function totalSupply() external view returns (uint256)
    ]"#
);

abigen!(
    KalaHook,
    r#"[
        function kalaOracle() external view returns (address)
        function ethUsdFeed() external view returns (address)
        function kalaToken() external view returns (address)
    ]"#
);

abigen!(
    PriceFeed,
    r#"[
        function decimals() external view returns (uint8)
        function latestRoundData() external view returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound)
    ]"#
);
